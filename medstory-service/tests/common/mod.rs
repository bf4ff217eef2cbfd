//! Shared fixtures: in-memory store wired to the real services.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use medstory_service::config::JwtConfig;
use medstory_service::models::RegisterRequest;
use medstory_service::services::{
    AuthService, JwtService, MockEmailService, OtpService,
};
use medstory_service::store::MemoryStore;

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub email: Arc<MockEmailService>,
    pub jwt: JwtService,
    pub auth: AuthService,
}

pub fn harness() -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let email = Arc::new(MockEmailService::new());
    let jwt = JwtService::new(&JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_token_expiry_minutes: 15,
        refresh_token_expiry_days: 7,
    });
    let otp = OtpService::new(store.clone(), email.clone());
    let auth = AuthService::new(store.clone(), jwt.clone(), otp);

    TestHarness {
        store,
        email,
        jwt,
        auth,
    }
}

pub fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "hunter2hunter2".to_string(),
        full_name: "Test User".to_string(),
    }
}

/// OTP emails are delivered from a background task; poll the mock
/// until the expected number of sends has landed.
pub async fn wait_for_emails(email: &MockEmailService, count: usize) -> Vec<(String, String)> {
    for _ in 0..100 {
        {
            let sent = email.sent.lock().unwrap();
            if sent.len() >= count {
                return sent.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} emails, got {}", count, email.sent.lock().unwrap().len());
}
