//! Add-form state
//!
//! UI-layer holder for the name/country inputs. Resetting the inputs is
//! decided here, not in the controller.

use crate::config::FormClearPolicy;
use crate::error::Result;
use crate::record::{Draft, Record};
use crate::sync::SyncController;

#[derive(Debug, Clone, Default)]
pub struct DraftForm {
    name: String,
    country: String,
    policy: FormClearPolicy,
    notice: Option<String>,
}

impl DraftForm {
    pub fn new(policy: FormClearPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn set_country(&mut self, country: &str) {
        self.country = country.to_string();
    }

    /// Message to show after the last failed submit
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.country.clear();
    }

    pub fn draft(&self) -> Draft {
        Draft::new(&self.name, &self.country)
    }

    /// Submit the current inputs through `controller`
    ///
    /// Inputs that fail the presence check, or that a disposed controller
    /// refuses, are never cleared. Otherwise the clear policy decides
    /// whether they are reset on dispatch or only once the server confirms
    /// the record.
    pub async fn submit(&mut self, controller: &SyncController) -> Result<Record> {
        let draft = self.draft();
        let dispatched = draft.validate().is_ok() && !controller.is_disposed();

        let pending = controller.add(draft);
        if dispatched && self.policy == FormClearPolicy::OnDispatch {
            self.clear();
        }

        match pending.await {
            Ok(record) => {
                self.notice = None;
                if self.policy == FormClearPolicy::OnSuccess {
                    self.clear();
                }
                Ok(record)
            }
            Err(e) => {
                self.notice = Some(e.to_string());
                Err(e)
            }
        }
    }
}
