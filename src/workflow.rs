use serde::Serialize;
use std::fmt;

/// The RPA workflows that get a page of their own
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Workflow {
    CogsaSafta,
    EdocUploadHandm,
    FcrSubmission,
    EinvoicingHandm,
    ExpDownload,
    ExpDuplication,
    RexIssuance,
}

impl Workflow {
    /// Sidebar order
    pub const ALL: [Workflow; 7] = [
        Workflow::CogsaSafta,
        Workflow::EdocUploadHandm,
        Workflow::FcrSubmission,
        Workflow::EinvoicingHandm,
        Workflow::ExpDownload,
        Workflow::ExpDuplication,
        Workflow::RexIssuance,
    ];

    /// Route segment, e.g. `/fcr-submission`
    pub fn slug(&self) -> &'static str {
        match self {
            Workflow::CogsaSafta => "cogsa-safta",
            Workflow::EdocUploadHandm => "edoc-upload-handm",
            Workflow::FcrSubmission => "fcr-submission",
            Workflow::EinvoicingHandm => "einvoicing-handm",
            Workflow::ExpDownload => "exp-download",
            Workflow::ExpDuplication => "exp-duplication",
            Workflow::RexIssuance => "rex-issuance",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Workflow::CogsaSafta => "COGSA / SAFTA",
            Workflow::EdocUploadHandm => "EDOC Upload (H&M)",
            Workflow::FcrSubmission => "FCR Submission",
            Workflow::EinvoicingHandm => "E-Invoicing (H&M)",
            Workflow::ExpDownload => "EXP Download",
            Workflow::ExpDuplication => "EXP Duplication",
            Workflow::RexIssuance => "REX Issuance",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Workflow> {
        Workflow::ALL.into_iter().find(|workflow| workflow.slug() == slug)
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}
