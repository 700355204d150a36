//! Full redaction action

use crate::action::{ActionOutput, Capability, Params, ProtectAction};
use fieldveil_core::{FieldValue, Result};

const DEFAULT_MARKER: &str = "[REDACTED]";

/// Irreversible replacement of the whole value with a fixed marker
#[derive(Debug, Default)]
pub struct RedactAction;

impl RedactAction {
    pub fn new() -> Self {
        Self
    }
}

impl ProtectAction for RedactAction {
    fn capability(&self) -> Capability {
        Capability::Irreversible
    }

    fn check_params(&self, params: &Params) -> Result<()> {
        params.str_opt("marker")?;
        Ok(())
    }

    fn transform(&self, _value: &FieldValue, params: &Params) -> Result<ActionOutput> {
        let marker = params.str_opt("marker")?.unwrap_or(DEFAULT_MARKER);
        Ok(ActionOutput::new(marker).with_summary("redacted"))
    }
}
