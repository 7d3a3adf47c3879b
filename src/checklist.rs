//! Post-trip document checklists and the completeness rule derived from them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::InspectionStatus;

/// Papers carried by the tractor unit ("cabeça").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct HorseChecklist {
    pub livrete: bool,
    pub caderneta: bool,
    pub seguro: bool,
    pub inspecao: bool,
    pub cfm: bool,
    pub moz_permit: bool,
    pub radio_difusao: bool,
    pub manifesto: bool,
    pub passaport: bool,
    pub carta_conducao: bool,
    pub comesa: bool,
}

/// Papers carried by the trailer ("trela"). Only some are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct TrailerChecklist {
    pub livrete: bool,
    pub caderneta: bool,
    pub seguro: bool,
    pub inspecao: bool,
    pub cfm: bool,
    pub moz_permit: bool,
    pub radio_difusao: bool,
    pub manifesto: bool,
    pub comesa: bool,
}

impl HorseChecklist {
    pub fn all_checked() -> Self {
        Self {
            livrete: true,
            caderneta: true,
            seguro: true,
            inspecao: true,
            cfm: true,
            moz_permit: true,
            radio_difusao: true,
            manifesto: true,
            passaport: true,
            carta_conducao: true,
            comesa: true,
        }
    }

    fn items(&self) -> [(&'static str, bool); 11] {
        [
            ("Livrete/White Book", self.livrete),
            ("Caderneta/Owner Title Book", self.caderneta),
            ("Seguro/Insurance", self.seguro),
            ("Inspeção/Inspeccionado", self.inspecao),
            ("Livre Trânsito CFM/Port Entrance", self.cfm),
            ("Mozambique Permit Licence", self.moz_permit),
            ("Radio Difusão/Radio Fusion Rate", self.radio_difusao),
            ("Manifesto Municipal", self.manifesto),
            ("Passaport", self.passaport),
            ("Carta de Condução/Licence", self.carta_conducao),
            ("COMESA/Yellow Book", self.comesa),
        ]
    }
}

impl TrailerChecklist {
    pub fn all_checked() -> Self {
        Self {
            livrete: true,
            caderneta: true,
            seguro: true,
            inspecao: true,
            cfm: true,
            moz_permit: true,
            radio_difusao: true,
            manifesto: true,
            comesa: true,
        }
    }

    /// The five trailer papers that count towards completeness.
    fn required_items(&self) -> [(&'static str, bool); 5] {
        [
            ("Livrete/White Book", self.livrete),
            ("Seguro/Insurance", self.seguro),
            ("Inspeção/Inspeccionado", self.inspecao),
            ("Manifesto Municipal", self.manifesto),
            ("COMESA/Yellow Book", self.comesa),
        ]
    }
}

/// Outcome of checking an inspection's papers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistAssessment {
    pub documents_complete: bool,
    /// Comma-joined labels of every unchecked required item
    pub missing_documents: String,
    pub status: InspectionStatus,
}

pub fn assess(horse: &HorseChecklist, trailer: &TrailerChecklist) -> ChecklistAssessment {
    let missing: Vec<String> = horse
        .items()
        .into_iter()
        .filter(|(_, checked)| !checked)
        .map(|(label, _)| format!("Cabeça: {label}"))
        .chain(
            trailer
                .required_items()
                .into_iter()
                .filter(|(_, checked)| !checked)
                .map(|(label, _)| format!("Trela: {label}")),
        )
        .collect();

    let documents_complete = missing.is_empty();
    ChecklistAssessment {
        documents_complete,
        missing_documents: missing.join(", "),
        status: if documents_complete {
            InspectionStatus::Verified
        } else {
            InspectionStatus::Incomplete
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_checked_papers_are_verified() {
        let result = assess(&HorseChecklist::all_checked(), &TrailerChecklist::all_checked());
        assert!(result.documents_complete);
        assert_eq!(result.status, InspectionStatus::Verified);
        assert_eq!(result.missing_documents, "");
    }

    #[test]
    fn optional_trailer_papers_do_not_affect_completeness() {
        let trailer = TrailerChecklist {
            caderneta: false,
            cfm: false,
            moz_permit: false,
            radio_difusao: false,
            ..TrailerChecklist::all_checked()
        };
        let result = assess(&HorseChecklist::all_checked(), &trailer);
        assert!(result.documents_complete);
        assert_eq!(result.status, InspectionStatus::Verified);
    }

    #[test]
    fn each_required_item_is_reported_alone_when_missing() {
        let horse_cases: Vec<(HorseChecklist, &str)> = vec![
            (HorseChecklist { livrete: false, ..HorseChecklist::all_checked() }, "Cabeça: Livrete/White Book"),
            (HorseChecklist { caderneta: false, ..HorseChecklist::all_checked() }, "Cabeça: Caderneta/Owner Title Book"),
            (HorseChecklist { seguro: false, ..HorseChecklist::all_checked() }, "Cabeça: Seguro/Insurance"),
            (HorseChecklist { inspecao: false, ..HorseChecklist::all_checked() }, "Cabeça: Inspeção/Inspeccionado"),
            (HorseChecklist { cfm: false, ..HorseChecklist::all_checked() }, "Cabeça: Livre Trânsito CFM/Port Entrance"),
            (HorseChecklist { moz_permit: false, ..HorseChecklist::all_checked() }, "Cabeça: Mozambique Permit Licence"),
            (HorseChecklist { radio_difusao: false, ..HorseChecklist::all_checked() }, "Cabeça: Radio Difusão/Radio Fusion Rate"),
            (HorseChecklist { manifesto: false, ..HorseChecklist::all_checked() }, "Cabeça: Manifesto Municipal"),
            (HorseChecklist { passaport: false, ..HorseChecklist::all_checked() }, "Cabeça: Passaport"),
            (HorseChecklist { carta_conducao: false, ..HorseChecklist::all_checked() }, "Cabeça: Carta de Condução/Licence"),
            (HorseChecklist { comesa: false, ..HorseChecklist::all_checked() }, "Cabeça: COMESA/Yellow Book"),
        ];
        for (horse, label) in horse_cases {
            let result = assess(&horse, &TrailerChecklist::all_checked());
            assert!(!result.documents_complete);
            assert_eq!(result.status, InspectionStatus::Incomplete);
            assert_eq!(result.missing_documents, label);
        }

        let trailer_cases: Vec<(TrailerChecklist, &str)> = vec![
            (TrailerChecklist { livrete: false, ..TrailerChecklist::all_checked() }, "Trela: Livrete/White Book"),
            (TrailerChecklist { seguro: false, ..TrailerChecklist::all_checked() }, "Trela: Seguro/Insurance"),
            (TrailerChecklist { inspecao: false, ..TrailerChecklist::all_checked() }, "Trela: Inspeção/Inspeccionado"),
            (TrailerChecklist { manifesto: false, ..TrailerChecklist::all_checked() }, "Trela: Manifesto Municipal"),
            (TrailerChecklist { comesa: false, ..TrailerChecklist::all_checked() }, "Trela: COMESA/Yellow Book"),
        ];
        for (trailer, label) in trailer_cases {
            let result = assess(&HorseChecklist::all_checked(), &trailer);
            assert!(!result.documents_complete);
            assert_eq!(result.missing_documents, label);
        }
    }

    #[test]
    fn empty_checklist_lists_all_sixteen_required_items_in_order() {
        let result = assess(&HorseChecklist::default(), &TrailerChecklist::default());
        let labels: Vec<&str> = result.missing_documents.split(", ").collect();
        assert_eq!(labels.len(), 16);
        assert_eq!(labels[0], "Cabeça: Livrete/White Book");
        assert_eq!(labels[11], "Trela: Livrete/White Book");
        assert_eq!(labels[15], "Trela: COMESA/Yellow Book");
    }
}
