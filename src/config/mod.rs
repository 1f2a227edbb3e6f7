//! Configuration module.
//!
//! [`loader`] resolves a [`ResolvedConfig`] from defaults, an optional TOML
//! file, environment variables and CLI flags. This module turns it into the
//! per-component settings the core consumes.

pub mod loader;

pub use loader::{ConfigError, ResolvedConfig};

use crate::camera::FitSettings;
use crate::canvas::SessionSettings;
use crate::navigation::NavigationSettings;
use crate::persistence::QueueSettings;

impl ResolvedConfig {
    /// Save queue timing.
    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            debounce_ms: self.debounce_ms,
            retry_attempts: self.retry_attempts,
            retry_base_ms: self.retry_base_ms,
        }
    }

    /// Navigation lock timing.
    pub fn navigation_settings(&self) -> NavigationSettings {
        NavigationSettings {
            lock_timeout_ms: self.nav_timeout_ms,
        }
    }

    /// Zoom-to-fit settings.
    pub fn fit_settings(&self) -> FitSettings {
        FitSettings {
            padding: self.fit_padding,
            duration_ms: self.fit_duration_ms,
            ..FitSettings::default()
        }
    }

    /// Session settings with every configurable part filled in.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            queue: self.queue_settings(),
            navigation: self.navigation_settings(),
            fit: self.fit_settings(),
            undo_capacity: self.undo_capacity,
            ..SessionSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_component_defaults() {
        let config = ResolvedConfig::default();
        assert_eq!(config.queue_settings(), QueueSettings::default());
        assert_eq!(config.navigation_settings(), NavigationSettings::default());
        assert_eq!(config.fit_settings(), FitSettings::default());
        assert_eq!(config.session_settings(), SessionSettings::default());
    }

    #[test]
    fn custom_values_flow_into_session_settings() {
        let config = ResolvedConfig {
            debounce_ms: 100,
            undo_capacity: 5,
            nav_timeout_ms: 3_000,
            fit_padding: 10.0,
            ..ResolvedConfig::default()
        };
        let settings = config.session_settings();
        assert_eq!(settings.queue.debounce_ms, 100);
        assert_eq!(settings.undo_capacity, 5);
        assert_eq!(settings.navigation.lock_timeout_ms, 3_000);
        assert_eq!(settings.fit.padding, 10.0);
        assert_eq!(settings.fit.breathing_room, 1.25);
    }
}
