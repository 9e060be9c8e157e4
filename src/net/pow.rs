//! Proof-of-work on event ids (NIP-13).
//!
//! Difficulty is the number of leading zero bits of the event id. The miner
//! commits to its target with a `["nonce", <n>, <target>]` tag so a relay can
//! tell deliberate work from luck.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::event::UnsignedEvent;
use super::NetError;

/// Callback receiving each new best difficulty reached while mining.
pub type OnBetterWork = Arc<dyn Fn(u32) + Send + Sync>;

/// Asynchronous proof-of-work collaborator.
pub trait PowMiner: Send + Sync {
    /// Returns `draft` with a nonce making its id meet `difficulty`.
    ///
    /// Must call `on_better_work` with each improvement, never above
    /// `difficulty`, before resolving.
    fn mine(
        &self,
        draft: UnsignedEvent,
        difficulty: u32,
        on_better_work: OnBetterWork,
    ) -> BoxFuture<'static, Result<UnsignedEvent, NetError>>;
}

/// Leading zero bits of `id`.
pub fn difficulty_of(id: &[u8; 32]) -> u32 {
    let mut bits = 0;
    for byte in id {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

/// CPU miner running on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nip13Miner;

impl Nip13Miner {
    fn mine_blocking(
        mut draft: UnsignedEvent,
        difficulty: u32,
        on_better_work: &OnBetterWork,
    ) -> Result<UnsignedEvent, NetError> {
        if difficulty > 256 {
            return Err(NetError::Mining(format!("difficulty {} exceeds 256", difficulty)));
        }

        draft.tags.retain(|t| t.first().map(String::as_str) != Some("nonce"));
        draft
            .tags
            .push(vec!["nonce".into(), "0".into(), difficulty.to_string()]);
        let slot = draft.tags.len() - 1;

        let mut best = 0;
        let mut nonce: u64 = 0;
        loop {
            draft.tags[slot][1] = nonce.to_string();
            let achieved = difficulty_of(&draft.id());
            if achieved > best {
                best = achieved;
                on_better_work(best.min(difficulty));
            }
            if achieved >= difficulty {
                log::debug!("Mined difficulty {} after {} attempts", achieved, nonce + 1);
                return Ok(draft);
            }
            nonce = nonce.wrapping_add(1);
            if nonce == 0 {
                // Exhausted the nonce space for this timestamp.
                draft.created_at += 1;
            }
        }
    }
}

impl PowMiner for Nip13Miner {
    fn mine(
        &self,
        draft: UnsignedEvent,
        difficulty: u32,
        on_better_work: OnBetterWork,
    ) -> BoxFuture<'static, Result<UnsignedEvent, NetError>> {
        async move {
            tokio::task::spawn_blocking(move || Self::mine_blocking(draft, difficulty, &on_better_work))
                .await
                .map_err(|e| NetError::Mining(e.to_string()))?
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Keys;
    use std::sync::Mutex;

    #[test]
    fn test_difficulty_of() {
        let mut id = [0xffu8; 32];
        assert_eq!(difficulty_of(&id), 0);
        id[0] = 0x00;
        id[1] = 0x1f;
        assert_eq!(difficulty_of(&id), 11);
        assert_eq!(difficulty_of(&[0u8; 32]), 256);
    }

    #[tokio::test]
    async fn test_mines_and_reports_progress() {
        let keys = Keys::generate();
        let draft = UnsignedEvent::new(
            keys.public_key(),
            26428,
            vec![vec!["p".into(), "x".into()], vec!["nonce".into(), "stale".into()]],
            "payload".into(),
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let report: OnBetterWork = Arc::new(move |d: u32| sink.lock().unwrap().push(d));

        let mined = Nip13Miner.mine(draft, 8, report).await.unwrap();
        assert!(difficulty_of(&mined.id()) >= 8);
        assert_eq!(mined.tags.iter().filter(|t| t[0] == "nonce").count(), 1);
        assert_eq!(mined.first_tag("nonce").unwrap()[2], "8");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&8));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));

        let event = mined.sign(&keys).unwrap();
        assert!(difficulty_of(&event.id) >= 8);
    }

    #[tokio::test]
    async fn test_rejects_impossible_target() {
        let keys = Keys::generate();
        let draft = UnsignedEvent::new(keys.public_key(), 1, vec![], String::new());
        let result = Nip13Miner.mine(draft, 257, Arc::new(|_: u32| {})).await;
        assert!(matches!(result, Err(NetError::Mining(_))));
    }
}
