pub mod alert_monitor;
pub mod market_service;
pub mod notifier;
pub mod position_rules;
