//! Route handlers for the REST API.

pub mod flows;
pub mod graph;
pub mod health;
pub mod history;
pub mod options;
pub mod preview;
pub mod reference;
pub mod schedule;
pub mod steps;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::Config;
    use crate::rest::state::ApiState;
    use crate::types::UssdService;

    /// API state over an in-memory store holding one service
    pub async fn state_with_service() -> (ApiState, UssdService) {
        let state = ApiState::in_memory(Config::default());
        let service = state
            .repo
            .insert_service(UssdService::new("DAPAY Wallet", "*150*88#"))
            .await
            .unwrap();
        (state, service)
    }
}
