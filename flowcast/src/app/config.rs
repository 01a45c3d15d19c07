//! Application configuration for `NavigationApp`.

use crate::config::ConfigFile;
use crate::routing::{RateLimitBackoff, RequestQueueConfig, RouteSessionConfig};
use crate::traffic::{GeneratorConfig, TrafficConfig};

/// Component configs combined for [`NavigationApp::start`](super::NavigationApp::start).
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub queue: RequestQueueConfig,
    pub session: RouteSessionConfig,
    pub traffic: TrafficConfig,
}

impl AppConfig {
    /// Build component configs from the settings file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        let routing = &config.routing;
        let traffic = &config.traffic;

        let backoff = RateLimitBackoff {
            max_retries: routing.max_retries,
            max_delay: routing.max_retry_delay,
            fallback_delay: routing.fallback_retry_delay,
            ..RateLimitBackoff::default()
        };

        Self {
            queue: RequestQueueConfig {
                backoff,
                cooldown: routing.cooldown,
                position_poll_attempts: routing.position_poll_attempts,
                position_poll_interval: routing.position_poll_interval,
                ..RequestQueueConfig::default()
            },
            session: RouteSessionConfig {
                arrival_radius_m: routing.arrival_radius_m,
            },
            traffic: TrafficConfig {
                refresh_interval: traffic.refresh_interval,
                min_generation_interval: traffic.min_interval,
                inter_request_delay: traffic.inter_request_delay,
                generator: GeneratorConfig {
                    bearing_count: traffic.bearing_count,
                    radius_deg: traffic.radius_deg,
                    max_concurrent_requests: traffic.max_concurrent_requests,
                },
                ..TrafficConfig::default()
            },
        }
    }

    /// Fix the traffic RNG seed.
    pub fn with_traffic_seed(mut self, seed: u64) -> Self {
        self.traffic.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_file_matches_default_config() {
        let from_file = AppConfig::from_config_file(&ConfigFile::default());
        let defaults = AppConfig::default();

        assert_eq!(from_file.queue.backoff, defaults.queue.backoff);
        assert_eq!(from_file.queue.cooldown, defaults.queue.cooldown);
        assert_eq!(
            from_file.session.arrival_radius_m,
            defaults.session.arrival_radius_m
        );
        assert_eq!(
            from_file.traffic.refresh_interval,
            defaults.traffic.refresh_interval
        );
        assert_eq!(
            from_file.traffic.generator.bearing_count,
            defaults.traffic.generator.bearing_count
        );
    }

    #[test]
    fn test_file_values_flow_into_components() {
        let mut file = ConfigFile::default();
        file.routing.max_retries = 1;
        file.routing.cooldown = Duration::from_millis(50);
        file.routing.arrival_radius_m = 35.0;
        file.traffic.bearing_count = 4;
        file.traffic.min_interval = Duration::from_secs(30);

        let config = AppConfig::from_config_file(&file).with_traffic_seed(7);
        assert_eq!(config.queue.backoff.max_retries, 1);
        assert_eq!(config.queue.cooldown, Duration::from_millis(50));
        assert_eq!(config.session.arrival_radius_m, 35.0);
        assert_eq!(config.traffic.generator.bearing_count, 4);
        assert_eq!(config.traffic.min_generation_interval, Duration::from_secs(30));
        assert_eq!(config.traffic.seed, Some(7));
    }
}
