//! Ticket code derivation.
//!
//! A code is a deterministic function of the ticket identity and a
//! server-side secret: `TKT-<ticket id>-<12 hex chars of HMAC-SHA256>`.
//! Re-deriving under reconciliation retries yields the same code, and the
//! suffix cannot be computed without the secret. The ticket id is visible in
//! the code on purpose; secrecy rests on the hash suffix and the server-side
//! lookup, not on code opacity.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const CODE_PREFIX: &str = "TKT";
const CODE_HASH_LEN: usize = 12;

#[derive(Clone)]
pub struct CodeGenerator {
    secret: String,
}

impl CodeGenerator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Derives the entry code for a ticket. Pure: same inputs, same code.
    pub fn generate(&self, ticket_id: Uuid, event_id: Uuid, buyer_id: Uuid) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(format!("{ticket_id}:{event_id}:{buyer_id}").as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());

        format!("{CODE_PREFIX}-{ticket_id}-{}", &digest[..CODE_HASH_LEN])
    }
}
