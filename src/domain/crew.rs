//! Crew member roles

use serde::{Deserialize, Serialize};

/// Role (`cargo`) of a crew member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrewRole {
    #[serde(rename = "Tripulante")]
    Crew,
    #[serde(rename = "Tripulante+")]
    SeniorCrew,
    #[serde(rename = "Gestor")]
    Manager,
}

impl CrewRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrewRole::Crew => "Tripulante",
            CrewRole::SeniorCrew => "Tripulante+",
            CrewRole::Manager => "Gestor",
        }
    }

    /// Managers may act on behalf of any crew member
    pub fn can_act_for_others(&self) -> bool {
        matches!(self, CrewRole::Manager)
    }

    /// Whether this role may publish ordens de serviço
    pub fn can_publish_notices(&self) -> bool {
        matches!(self, CrewRole::SeniorCrew | CrewRole::Manager)
    }
}

impl Default for CrewRole {
    fn default() -> Self {
        Self::Crew
    }
}

impl std::str::FromStr for CrewRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Tripulante" => Ok(CrewRole::Crew),
            "Tripulante+" => Ok(CrewRole::SeniorCrew),
            "Gestor" => Ok(CrewRole::Manager),
            other => Err(format!("unknown crew role: {other}")),
        }
    }
}

impl std::fmt::Display for CrewRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
