use std::sync::Arc;

use authbed_security::ClaimsValidator;
use axum::extract::FromRef;

use crate::services::ValueService;

#[derive(Clone)]
pub struct ValuesState {
    pub validator: Arc<ClaimsValidator>,
    pub values: ValueService,
}

impl FromRef<ValuesState> for Arc<ClaimsValidator> {
    fn from_ref(state: &ValuesState) -> Self {
        state.validator.clone()
    }
}

impl FromRef<ValuesState> for ValueService {
    fn from_ref(state: &ValuesState) -> Self {
        state.values.clone()
    }
}
