//! Authentication
//!
//! Crew accounts, password verification and bearer sessions.

pub mod password;
pub mod repository;

use serde::Serialize;

use crate::domain::CrewRole;
use crate::error::AppError;

pub use repository::{AuthRepository, NewCrewAccount, StoredCrewAccount};

/// Crew member resolved from a valid session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedCrew {
    pub numero: String,
    pub nome: String,
    pub cargo: CrewRole,
}

impl AuthenticatedCrew {
    /// Whether this caller may act for the given badge number
    pub fn may_act_for(&self, crew_member_id: &str) -> bool {
        self.numero == crew_member_id || self.cargo.can_act_for_others()
    }
}

/// Reject a request made on behalf of another crew member.
///
/// Routers mounted without the auth middleware (tests, internal tools) pass
/// `None` and are not restricted.
pub fn ensure_acting_for(
    caller: Option<&AuthenticatedCrew>,
    crew_member_id: &str,
) -> Result<(), AppError> {
    match caller {
        Some(crew) if !crew.may_act_for(crew_member_id) => Err(AppError::Forbidden(
            "Não pode atuar em nome de outro tripulante".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Decide whether a registration may create an account with `requested`.
///
/// Plain crew accounts are self-service. Any elevated role has to be granted
/// by a signed-in manager.
pub fn authorize_requested_role(
    requested: CrewRole,
    caller: Option<&AuthenticatedCrew>,
) -> Result<(), AppError> {
    if requested == CrewRole::Crew {
        return Ok(());
    }
    match caller {
        Some(crew) if crew.cargo == CrewRole::Manager => Ok(()),
        Some(_) => Err(AppError::Forbidden(
            "Apenas um Gestor pode atribuir este cargo".to_string(),
        )),
        None => Err(AppError::Forbidden(
            "É necessária sessão de Gestor para atribuir este cargo".to_string(),
        )),
    }
}
