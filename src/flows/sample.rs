//! Sample data for a fresh install.

use std::sync::Arc;

use super::{FlowError, FlowManager, NewFlow, NewOption, NewStep, StepEditor};
use crate::store::FlowRepository;
use crate::types::{MenuFlow, Mno, ResponseType, UssdService};

pub const SAMPLE_USSD_CODE: &str = "*150*88#";

/// What [`seed`] created
#[derive(Debug, Clone)]
pub struct SeedSummary {
    pub mno: Mno,
    pub service: UssdService,
    pub flow: MenuFlow,
    pub steps: usize,
    pub options: usize,
}

/// Create a DAPAY wallet service with a small main-menu flow.
///
/// Reuses the service when its short code is already registered.
pub async fn seed(
    repo: Arc<dyn FlowRepository>,
    manager: &FlowManager,
    editor: &StepEditor,
    performed_by: &str,
) -> Result<SeedSummary, FlowError> {
    let existing = repo
        .list_services()
        .await?
        .into_iter()
        .find(|s| s.ussd_code == SAMPLE_USSD_CODE);

    let (mno, service) = match existing {
        Some(service) => {
            let mno = match service.mno_id {
                Some(id) => repo.get_mno(id).await?,
                None => repo.insert_mno(sample_mno()).await?,
            };
            (mno, service)
        }
        None => {
            let mno = repo.insert_mno(sample_mno()).await?;
            let mut service = UssdService::new("DAPAY Wallet", SAMPLE_USSD_CODE);
            service.mno_id = Some(mno.id);
            service.description = "Mobile wallet for agents and customers".to_string();
            (mno, repo.insert_service(service).await?)
        }
    };

    let flow = manager
        .create(
            NewFlow {
                name: "DAPAY Main Menu".to_string(),
                service_id: service.id,
                description: Some("Send money, balance and airtime".to_string()),
                language: None,
            },
            performed_by,
        )
        .await?;

    let step = |name: &str, text: &str, response_type: ResponseType| NewStep {
        step_name: name.to_string(),
        menu_text: text.to_string(),
        response_type,
        ..NewStep::default()
    };

    let main = editor
        .create_step(
            flow.id,
            NewStep {
                is_initial_step: true,
                fallback_message: Some("Invalid choice. Reply 1-4.".to_string()),
                ..step("main", "Welcome to DAPAY", ResponseType::Selection)
            },
        )
        .await?;
    let recipient = editor
        .create_step(
            flow.id,
            NewStep {
                api_endpoint: Some("/transfers/validate-recipient".to_string()),
                ..step("send_money", "Enter recipient phone number", ResponseType::Input)
            },
        )
        .await?;
    let balance = editor
        .create_step(flow.id, step("balance", "Your balance will arrive by SMS", ResponseType::End))
        .await?;
    let airtime = editor
        .create_step(
            flow.id,
            step("airtime", "Buy TZS 1,000 airtime?\n1. Yes\n2. No", ResponseType::Confirmation),
        )
        .await?;
    let goodbye = editor
        .create_step(flow.id, step("goodbye", "Thank you for using DAPAY", ResponseType::End))
        .await?;

    let entries = [
        (1, "Send Money", recipient.id),
        (2, "Check Balance", balance.id),
        (3, "Buy Airtime", airtime.id),
        (4, "Exit", goodbye.id),
    ];
    for (number, text, target) in entries {
        editor
            .create_option(
                main.id,
                NewOption {
                    option_number: number,
                    option_text: text.to_string(),
                    next_step_id: Some(target),
                    ..NewOption::default()
                },
            )
            .await?;
    }

    tracing::info!(flow_id = %flow.id, service = %service.ussd_code, "Seeded sample flow");
    Ok(SeedSummary {
        mno,
        service,
        flow,
        steps: 5,
        options: entries.len(),
    })
}

fn sample_mno() -> Mno {
    let mut mno = Mno::new("Vodacom Tanzania", "TZ");
    mno.mcc_mnc = Some("640-04".to_string());
    mno
}
