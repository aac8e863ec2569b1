//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Hours an unconfirmed claim is held before the sweep reclaims it.
pub const DEFAULT_CLAIM_TIMEOUT_HOURS: i64 = 48;

/// Default reservation time-to-live when the caller does not pick one.
pub const DEFAULT_RESERVATION_TTL_HOURS: i64 = 72;

/// Operational knobs for the claim and reservation services.
///
/// All values have working defaults; deployments override the ones they
/// care about through whatever configuration source loads this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hours before an unconfirmed claim is reclaimed by the sweep.
    pub claim_timeout_hours: i64,

    /// Reservation TTL applied when the caller passes `None`.
    pub default_reservation_ttl_hours: i64,

    /// Smallest TTL a caller may request.
    pub min_reservation_ttl_hours: i64,

    /// Largest TTL a caller may request.
    pub max_reservation_ttl_hours: i64,

    /// Upper bound on children per reservation.
    pub max_children_per_reservation: usize,

    /// Upper bound on sponsor free-text message length.
    pub max_message_length: usize,

    /// Upper bound on sponsor name length.
    pub max_name_length: usize,

    /// Batch size for sweep candidate queries.
    pub sweep_batch_size: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            claim_timeout_hours: DEFAULT_CLAIM_TIMEOUT_HOURS,
            default_reservation_ttl_hours: DEFAULT_RESERVATION_TTL_HOURS,
            min_reservation_ttl_hours: 1,
            max_reservation_ttl_hours: 168,
            max_children_per_reservation: 10,
            max_message_length: 2000,
            max_name_length: 200,
            sweep_batch_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.claim_timeout_hours, 48);
        assert_eq!(config.default_reservation_ttl_hours, 72);
        assert!(config.min_reservation_ttl_hours <= config.default_reservation_ttl_hours);
        assert!(config.default_reservation_ttl_hours <= config.max_reservation_ttl_hours);
    }

    #[test]
    fn test_round_trips_through_serde() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.claim_timeout_hours, config.claim_timeout_hours);
        assert_eq!(back.sweep_batch_size, config.sweep_batch_size);
    }
}
