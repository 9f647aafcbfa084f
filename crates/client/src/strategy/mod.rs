//! Cache strategy selection.
//!
//! Navigations always take network-first with the navigation timeout so a
//! stale HTML shell is never served while the network is reachable. Other
//! requests walk the ordered rule table; the first rule with a pattern
//! contained in the URL wins, otherwise the default strategy applies.

mod runner;

pub use runner::{Revalidation, StrategyRunner};

use pwacache_core::{AppConfig, Strategy, StrategyRule};
use serde::Serialize;

use crate::fetch::{FetchRequest, RequestMode};

/// The path a request takes through the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Network-first with the navigation timeout, then cache, then the offline document.
    Navigation,
    Strategy(Strategy),
}

impl Route {
    pub fn label(&self) -> &'static str {
        match self {
            Route::Navigation => "navigation",
            Route::Strategy(strategy) => strategy.as_str(),
        }
    }
}

/// Ordered pattern table plus default.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<StrategyRule>,
    default: Strategy,
}

impl Classifier {
    pub fn new(rules: Vec<StrategyRule>, default: Strategy) -> Self {
        Self { rules, default }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.strategies.clone(), config.default_strategy)
    }

    pub fn classify(&self, request: &FetchRequest) -> Route {
        if request.mode == RequestMode::Navigate {
            return Route::Navigation;
        }

        let href = request.url.as_str();
        let strategy = self
            .rules
            .iter()
            .find(|rule| rule.patterns.iter().any(|p| !p.is_empty() && href.contains(p.as_str())))
            .map(|rule| rule.strategy)
            .unwrap_or(self.default);

        Route::Strategy(strategy)
    }
}
