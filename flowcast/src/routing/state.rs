//! Observable route session state.

use std::sync::Arc;
use std::time::Duration;

use super::error::RETRYING_MESSAGE;
use super::RouteError;
use crate::coord::MapRegion;
use crate::provider::{Route, RouteStep};

/// Coarse lifecycle phase of a route session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing requested or selected.
    Idle,
    /// A calculation is queued or in flight and nothing is selected yet.
    Pending,
    /// Candidates are available for selection.
    RoutesAvailable,
    /// Turn-by-turn guidance is active.
    Navigating,
}

impl SessionPhase {
    /// User-facing label.
    pub fn display_status(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::Pending => "Calculating...",
            SessionPhase::RoutesAvailable => "Routes ready",
            SessionPhase::Navigating => "Navigating",
        }
    }
}

/// Progress of the latest directions request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Calculating,
    /// Waiting `delay` before retry number `attempt`.
    Retrying { attempt: u32, delay: Duration },
}

/// Navigation progress flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationState {
    pub is_navigating: bool,
    pub current_step_index: usize,
    /// Set by the user, cleared by the map once it has recentered.
    pub should_recenter: bool,
}

/// Snapshot of everything a route session publishes.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Candidates from the latest successful calculation.
    pub available_routes: Vec<Arc<Route>>,
    pub selected_route: Option<Arc<Route>>,
    pub current_step: Option<RouteStep>,
    pub navigation: NavigationState,
    pub show_route_choices: bool,
    pub is_calculating: bool,
    pub request_status: RequestStatus,
    pub route_error: Option<RouteError>,
    pub destination_name: Option<String>,
    pub region: MapRegion,
    /// The final step has been reached; navigation stays active until ended.
    pub arrived: bool,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        if self.navigation.is_navigating {
            SessionPhase::Navigating
        } else if self.selected_route.is_some() {
            SessionPhase::RoutesAvailable
        } else if self.is_calculating {
            SessionPhase::Pending
        } else {
            SessionPhase::Idle
        }
    }

    pub fn is_navigating(&self) -> bool {
        self.navigation.is_navigating
    }

    pub fn step_index(&self) -> usize {
        self.navigation.current_step_index
    }

    /// Message for the status banner: retry notice or terminal error.
    pub fn status_message(&self) -> Option<String> {
        if let RequestStatus::Retrying { .. } = self.request_status {
            return Some(RETRYING_MESSAGE.to_string());
        }
        self.route_error.as_ref().map(|e| e.to_string())
    }

    /// Steps after the current one on the selected route.
    pub fn upcoming_steps(&self) -> &[RouteStep] {
        match &self.selected_route {
            Some(route) => {
                let start = (self.navigation.current_step_index + 1).min(route.steps.len());
                &route.steps[start..]
            }
            None => &[],
        }
    }

    /// Whether `route` is the selected one (by identity).
    pub fn is_selected(&self, route: &Arc<Route>) -> bool {
        self.selected_route
            .as_ref()
            .is_some_and(|selected| Arc::ptr_eq(selected, route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;

    fn route(steps: usize) -> Arc<Route> {
        Arc::new(Route::new(
            (0..steps)
                .map(|i| RouteStep::new(format!("step {}", i), 10.0, vec![Coordinate::new(i as f64, 0.0)]))
                .collect(),
            Duration::from_secs(60),
            100.0,
        ))
    }

    #[test]
    fn test_phase_derivation() {
        let mut state = SessionState::default();
        assert_eq!(state.phase(), SessionPhase::Idle);

        state.is_calculating = true;
        assert_eq!(state.phase(), SessionPhase::Pending);

        state.selected_route = Some(route(2));
        assert_eq!(state.phase(), SessionPhase::RoutesAvailable);

        state.navigation.is_navigating = true;
        assert_eq!(state.phase(), SessionPhase::Navigating);
    }

    #[test]
    fn test_status_message_prefers_retry_notice() {
        let mut state = SessionState {
            route_error: Some(RouteError::NoRoutesFound),
            ..Default::default()
        };
        assert_eq!(state.status_message().as_deref(), Some("No routes found"));

        state.request_status = RequestStatus::Retrying {
            attempt: 1,
            delay: Duration::from_secs(3),
        };
        assert_eq!(state.status_message().as_deref(), Some(RETRYING_MESSAGE));
    }

    #[test]
    fn test_upcoming_steps() {
        let mut state = SessionState {
            selected_route: Some(route(3)),
            ..Default::default()
        };
        assert_eq!(state.upcoming_steps().len(), 2);
        state.navigation.current_step_index = 2;
        assert!(state.upcoming_steps().is_empty());
    }

    #[test]
    fn test_is_selected_by_identity() {
        let a = route(1);
        let b = route(1);
        let state = SessionState {
            selected_route: Some(a.clone()),
            ..Default::default()
        };
        assert!(state.is_selected(&a));
        assert!(!state.is_selected(&b));
    }
}
