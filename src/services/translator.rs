use crate::domain::push::{AndroidConfig, PAYLOAD_DATA_KEY, Priority, ProviderMessage, PushRequest};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::BTreeMap;

/// Maps validated push requests onto provider messages.
#[derive(Clone, Debug, Default)]
pub struct MessageTranslator {
    restricted_package_name: Option<String>,
}

impl MessageTranslator {
    #[must_use]
    pub const fn new(restricted_package_name: Option<String>) -> Self {
        Self { restricted_package_name }
    }

    #[must_use]
    pub fn translate(&self, request: &PushRequest) -> ProviderMessage {
        ProviderMessage {
            token: request.token.clone(),
            data: BTreeMap::from([(PAYLOAD_DATA_KEY.to_string(), STANDARD.encode(&request.payload))]),
            android: AndroidConfig {
                restricted_package_name: self.restricted_package_name.clone(),
                priority: Priority::from(request.high_priority),
            },
        }
    }
}
