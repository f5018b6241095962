use chrono::Duration;
use rand::RngExt;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::domain::clock::Clock;
use crate::domain::repository::CodeRepository;
use crate::domain::types::{CODE_LEN, CODE_TTL_SECS, StepUpCode};
use crate::error::TrustServiceError;

/// Fixed-length numeric code from the thread-local CSPRNG.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Issues and checks single-use step-up codes for an opaque subject.
///
/// Each subject has one code slot: issuing revokes the previous code.
pub struct CodeIssuer<C, K>
where
    C: CodeRepository,
    K: Clock,
{
    pub codes: C,
    pub clock: K,
    pub generate: fn() -> String,
    pub ttl: Duration,
}

impl<C, K> CodeIssuer<C, K>
where
    C: CodeRepository,
    K: Clock,
{
    pub fn new(codes: C, clock: K) -> Self {
        Self {
            codes,
            clock,
            generate: generate_code,
            ttl: Duration::seconds(CODE_TTL_SECS),
        }
    }

    pub async fn issue(&self, subject_id: Uuid) -> Result<String, TrustServiceError> {
        let now = self.clock.now();
        let code = StepUpCode {
            id: Uuid::new_v4(),
            subject_id,
            code: (self.generate)(),
            issued_at: now,
            expires_at: now + self.ttl,
            consumed_at: None,
        };
        self.codes.replace(&code).await?;
        tracing::debug!(%subject_id, expires_at = %code.expires_at, "step-up code issued");
        Ok(code.code)
    }

    /// Fails closed: absent, expired, consumed and mismatched codes all yield
    /// `false`. A mismatch leaves the stored code untouched.
    pub async fn validate(&self, subject_id: Uuid, submitted: &str) -> Result<bool, TrustServiceError> {
        let now = self.clock.now();
        let Some(code) = self.codes.find_outstanding(subject_id, now).await? else {
            return Ok(false);
        };
        if !code.is_valid(now) {
            return Ok(false);
        }
        let matches: bool = code.code.as_bytes().ct_eq(submitted.as_bytes()).into();
        if !matches {
            return Ok(false);
        }
        let consumed = self.codes.consume(code.id, now).await?;
        if !consumed {
            tracing::debug!(%subject_id, "step-up code consumed by a concurrent caller");
        }
        Ok(consumed)
    }

    pub async fn invalidate(&self, subject_id: Uuid) -> Result<(), TrustServiceError> {
        let revoked = self.codes.consume_all(subject_id, self.clock.now()).await?;
        if revoked > 0 {
            tracing::debug!(%subject_id, revoked, "step-up codes revoked");
        }
        Ok(())
    }
}
