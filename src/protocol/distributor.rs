//! Concurrent share distribution.
//!
//! One delivery attempt is started per candidate signer. Each attempt claims a
//! share from the admission pool, encrypts it for the signer, mines proof of work
//! (one attempt at a time), publishes it, and waits for the signer's signed
//! acknowledgement under a single deadline. Failed attempts return their share
//! for the next candidate until the failure budget runs out.
//!
//! Once every share is acknowledged the dealer announces a
//! [`CoordinationRecord`] to the coordinator.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::{join_all, try_join};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::timeout;
use zeroize::Zeroizing;

use super::admission::{Admission, Settlement};
use super::progress::{ProgressCallback, ProgressTracker};
use super::record::CoordinationRecord;
use super::DistributionError;
use crate::config::DistributorConfig;
use crate::curve::{compress, Keys, PubKey};
use crate::mpc::{deal_shares, KeyShare};
use crate::net::{cipher, publish_to_any, Filter, PowMiner, Tag, Transport, UnsignedEvent};

/// How far a signer's clock may lag ours when querying acknowledgements.
const ACK_CLOCK_SKEW_SECS: u64 = 300;

/// Per-signer outcome: `None` on acceptance, the error otherwise.
pub type OutcomeCallback = Arc<dyn Fn(&PubKey, Option<&DistributionError>) + Send + Sync>;

/// Everything one distribution run needs besides the shares and the keys.
#[derive(Debug, Clone)]
pub struct DistributionRequest {
    pub threshold: u32,
    pub max_signers: u32,
    /// Candidate signers in preference order. Duplicates are ignored.
    pub candidates: Vec<PubKey>,
    /// Relay URL the coordination record is published to.
    pub coordinator: String,
    pub pow_difficulty: u32,
    /// Known inbox relays per signer.
    pub inboxes: HashMap<PubKey, Vec<String>>,
    /// The dealer's own inbox relays, listened on for acknowledgements.
    pub our_inbox: Vec<String>,
}

enum Delivered {
    Accepted,
    /// The run aborted before this attempt started mining.
    Abandoned,
}

/// State shared by every attempt of one run.
struct Run<'a> {
    keys: &'a Keys,
    request: &'a DistributionRequest,
    admission: Admission,
    progress: Arc<ProgressTracker>,
    reply_relays: Vec<String>,
    listen_relays: Vec<String>,
}

pub struct Distributor {
    transport: Arc<dyn Transport>,
    miner: Arc<dyn PowMiner>,
    config: DistributorConfig,
    on_progress: Option<ProgressCallback>,
    on_outcome: Option<OutcomeCallback>,
    /// Serializes mining across every attempt of every run.
    mining: Mutex<()>,
}

impl Distributor {
    pub fn new(transport: Arc<dyn Transport>, miner: Arc<dyn PowMiner>, config: DistributorConfig) -> Self {
        Self {
            transport,
            miner,
            config,
            on_progress: None,
            on_outcome: None,
            mining: Mutex::new(()),
        }
    }

    /// Reports overall mining progress in percent.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Reports each signer's outcome as its attempt settles.
    pub fn with_outcome<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PubKey, Option<&DistributionError>) + Send + Sync + 'static,
    {
        self.on_outcome = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &DistributorConfig {
        &self.config
    }

    /// Deals the dealer's own secret key and distributes the shares.
    ///
    /// The group key of the dealing is the dealer's x-only public key.
    pub async fn shard_and_distribute(
        &self,
        keys: &Keys,
        request: &DistributionRequest,
    ) -> Result<CoordinationRecord, DistributionError> {
        let secret = Zeroizing::new(keys.secret_scalar()?);
        let dealing = deal_shares(&secret, request.threshold, request.max_signers)?;
        if compress(&dealing.group_pubkey)[1..] != keys.public_key().as_bytes()[..] {
            return Err(DistributionError::Crypto("group key does not match dealer key".into()));
        }
        log::info!(
            "Dealt {}-of-{} shares for {}",
            request.threshold,
            request.max_signers,
            keys.public_key()
        );
        self.distribute(dealing.shares, keys, request).await
    }

    /// Delivers `shares` to the candidates and announces the result.
    ///
    /// # Returns
    /// * `Ok(CoordinationRecord)` - Every share was acknowledged and the
    ///   coordinator accepted the record.
    /// * `Err(DistributionError::InvalidParameters)` - Bad threshold, or the
    ///   share count differs from `max_signers`.
    /// * `Err(DistributionError::InsufficientSigners)` - The quorum was not
    ///   reached.
    /// * `Err(DistributionError::CoordinatorPublishFailure)` - Every share was
    ///   placed but the record was rejected.
    pub async fn distribute(
        &self,
        shares: Vec<KeyShare>,
        keys: &Keys,
        request: &DistributionRequest,
    ) -> Result<CoordinationRecord, DistributionError> {
        let required = request.max_signers as usize;
        if request.threshold == 0 || request.threshold > request.max_signers || shares.len() != required {
            return Err(DistributionError::InvalidParameters);
        }

        let candidates = distinct(&request.candidates);
        if candidates.len() < required {
            log::warn!("Only {} candidates for {} shares", candidates.len(), required);
            return Err(DistributionError::InsufficientSigners { accepted: 0, required });
        }

        let reply_relays = self.config.reply_relays();
        let listen_relays = distinct(request.our_inbox.iter().chain(reply_relays.iter()));
        let run = Run {
            keys,
            request,
            admission: Admission::new(shares, candidates.len()),
            progress: ProgressTracker::new(request.pow_difficulty, required, self.on_progress.clone()),
            reply_relays,
            listen_relays,
        };

        join_all(candidates.iter().map(|signer| self.attempt(&run, signer))).await;

        let failures = run.admission.failures();
        let accepted = run.admission.finish().map_err(|err| {
            log::warn!("Distribution failed after {} failed attempts: {}", failures, err);
            err
        })?;
        log::info!("All {} shares acknowledged", accepted.len());

        self.announce(keys, request, accepted).await
    }

    async fn attempt(&self, run: &Run<'_>, signer: &PubKey) {
        let Some(slot) = run.admission.claim().await else {
            return;
        };
        let Some((id, public_hex)) = slot.share().map(|s| (s.id(), s.public_share.to_hex())) else {
            return;
        };
        let progress_slot = usize::from(id).saturating_sub(1);

        let inbox = match run.request.inboxes.get(signer) {
            Some(relays) if !relays.is_empty() => relays,
            _ => {
                log::warn!("Signer {} has no known relays, returning share {}", signer, id);
                slot.give_back();
                self.notify(signer, Some(&DistributionError::SignerUnreachable));
                return;
            }
        };

        let result = match slot.share() {
            Some(share) => self.deliver(run, signer, inbox, share).await,
            None => return,
        };

        match result {
            Ok(Delivered::Accepted) => {
                log::info!("Signer {} acknowledged share {}", signer, id);
                self.notify(signer, None);
                if slot.accept(*signer, public_hex) == Settlement::Quorum {
                    log::info!("Quorum of {} signers reached", run.request.max_signers);
                }
            }
            Ok(Delivered::Abandoned) => {
                log::debug!("Abandoning share {} for {}: distribution aborted", id, signer);
                run.progress.reset(progress_slot);
                slot.give_back();
            }
            Err(err) => {
                run.progress.reset(progress_slot);
                let aborted = slot.fail();
                log::warn!("Delivery of share {} to {} failed: {}", id, signer, err);
                if aborted {
                    log::warn!("Failure budget exhausted, aborting distribution");
                }
                self.notify(signer, Some(&err));
            }
        }
    }

    async fn deliver(
        &self,
        run: &Run<'_>,
        signer: &PubKey,
        inbox: &[String],
        share: &KeyShare,
    ) -> Result<Delivered, DistributionError> {
        let kinds = self.config.kinds;
        let payload = cipher::encrypt(run.keys, signer, share.to_hex().as_bytes())?;

        let mut reply = vec!["reply".to_string()];
        reply.extend(run.reply_relays.iter().cloned());
        let tags: Vec<Tag> = vec![
            vec!["p".into(), signer.to_hex()],
            vec!["coordinator".into(), run.request.coordinator.clone()],
            reply,
        ];
        let draft = UnsignedEvent::new(run.keys.public_key(), kinds.shard, tags, payload);

        let mined = {
            let _mining = self.mining.lock().await;
            if run.admission.is_aborted() {
                return Ok(Delivered::Abandoned);
            }
            let reporter = run.progress.reporter(usize::from(share.id()).saturating_sub(1));
            self.miner.mine(draft, run.request.pow_difficulty, reporter).await?
        };
        let event = mined.sign(run.keys)?;

        let filter = Filter::new()
            .kind(kinds.shard_ack)
            .author(*signer)
            .p_tag(run.keys.public_key().to_hex())
            .e_tag(event.id_hex())
            .since(event.created_at.saturating_sub(ACK_CLOCK_SKEW_SECS));
        // Subscribe before publishing so a fast acknowledgement is not missed.
        let mut acks = self.transport.subscribe(&run.listen_relays, filter.clone());

        let published = async {
            publish_to_any(self.transport.as_ref(), inbox, &event)
                .await
                .map_err(DistributionError::from)
        };
        let acknowledged = async {
            while let Some(reply) = acks.next().await {
                if filter.matches(&reply) && reply.verify() {
                    return Ok(());
                }
            }
            Err(DistributionError::DeliveryTimeout)
        };

        match timeout(self.config.ack_timeout, try_join(published, acknowledged)).await {
            Ok(Ok((relay, ()))) => {
                log::debug!("Shard {} for {} published via {}", event.id_hex(), signer, relay);
                Ok(Delivered::Accepted)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(DistributionError::DeliveryTimeout),
        }
    }

    async fn announce(
        &self,
        keys: &Keys,
        request: &DistributionRequest,
        accepted: Vec<(PubKey, String)>,
    ) -> Result<CoordinationRecord, DistributionError> {
        let record = CoordinationRecord::build(
            keys,
            accepted,
            request.threshold,
            Keys::generate(),
            self.config.kinds.registration,
        )?;

        let coordinator = [request.coordinator.clone()];
        let mut last_error = String::from("coordinator did not respond");
        let mut published = false;
        {
            let mut outcomes = self.transport.publish(&coordinator, &record.event);
            while let Some(outcome) = outcomes.next().await {
                match outcome.result {
                    Ok(()) => {
                        published = true;
                        break;
                    }
                    Err(reason) => last_error = reason,
                }
            }
        }

        if !published {
            let message = if last_error.starts_with("Error:") {
                last_error
            } else {
                format!("Error: {}", last_error)
            };
            log::warn!("Coordinator {} rejected the record: {}", request.coordinator, message);
            return Err(DistributionError::CoordinatorPublishFailure(message));
        }

        log::info!(
            "Coordinator {} accepted record {} (handler {})",
            request.coordinator,
            record.event.id_hex(),
            record.handler_pubkey()
        );
        Ok(record)
    }

    fn notify(&self, signer: &PubKey, outcome: Option<&DistributionError>) {
        if let Some(callback) = &self.on_outcome {
            callback(signer, outcome);
        }
    }
}

/// First occurrence of each item, in order.
fn distinct<'a, T, I>(items: I) -> Vec<T>
where
    T: Clone + Eq + std::hash::Hash + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::mul_base;
    use crate::mpc::{reconstruct_secret, verify_share};
    use crate::net::{Event, OnBetterWork, PublishOutcome};
    use futures::channel::mpsc;
    use futures::future::BoxFuture;
    use futures::stream::{self, BoxStream};
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    const COORDINATOR: &str = "wss://coordinator.test";
    const OUR_INBOX: &str = "wss://dealer.test";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Behaviour {
        Ack,
        /// Acknowledges with a timestamp older than any query window.
        StaleAck,
        Silent,
        Reject,
    }

    struct MockSigner {
        keys: Keys,
        relay: String,
        behaviour: Behaviour,
    }

    /// In-memory relays: one inbox per signer plus the coordinator.
    struct MockNetwork {
        signers: Vec<MockSigner>,
        coordinator_error: Option<String>,
        subscribers: StdMutex<Vec<(Filter, Vec<String>, mpsc::UnboundedSender<Event>)>>,
        shards: StdMutex<Vec<(PubKey, Event)>>,
        announcements: StdMutex<Vec<Event>>,
    }

    impl MockNetwork {
        fn new(behaviours: &[Behaviour]) -> Self {
            let signers = behaviours
                .iter()
                .enumerate()
                .map(|(i, behaviour)| MockSigner {
                    keys: Keys::generate(),
                    relay: format!("wss://signer-{}.test", i),
                    behaviour: *behaviour,
                })
                .collect();
            Self {
                signers,
                coordinator_error: None,
                subscribers: StdMutex::new(Vec::new()),
                shards: StdMutex::new(Vec::new()),
                announcements: StdMutex::new(Vec::new()),
            }
        }

        fn rejecting_coordinator(mut self, reason: &str) -> Self {
            self.coordinator_error = Some(reason.to_string());
            self
        }

        fn candidates(&self) -> Vec<PubKey> {
            self.signers.iter().map(|s| s.keys.public_key()).collect()
        }

        fn inboxes(&self) -> HashMap<PubKey, Vec<String>> {
            self.signers
                .iter()
                .map(|s| (s.keys.public_key(), vec![s.relay.clone()]))
                .collect()
        }

        fn signer(&self, pubkey: &PubKey) -> &MockSigner {
            self.signers.iter().find(|s| s.keys.public_key() == *pubkey).unwrap()
        }

        /// Acknowledgement the way a signer sends it, to the reply relays.
        fn acknowledge(&self, signer: &MockSigner, shard: &Event) {
            let mut ack = UnsignedEvent::new(
                signer.keys.public_key(),
                26429,
                vec![
                    vec!["p".into(), shard.pubkey.to_hex()],
                    vec!["e".into(), shard.id_hex()],
                ],
                String::new(),
            );
            if signer.behaviour == Behaviour::StaleAck {
                ack.created_at = shard.created_at - 3600;
            }
            let ack = ack.sign(&signer.keys).unwrap();
            let reply_relays = &shard.first_tag("reply").unwrap()[1..];

            for (filter, relays, tx) in self.subscribers.lock().unwrap().iter() {
                let listening = relays.iter().any(|r| reply_relays.contains(r));
                if listening && filter.matches(&ack) {
                    let _ = tx.unbounded_send(ack.clone());
                }
            }
        }

        fn receive(&self, relay: &str, event: &Event) -> Result<(), String> {
            if relay == COORDINATOR {
                return match &self.coordinator_error {
                    Some(reason) => Err(reason.clone()),
                    None => {
                        self.announcements.lock().unwrap().push(event.clone());
                        Ok(())
                    }
                };
            }
            let Some(signer) = self.signers.iter().find(|s| s.relay == relay) else {
                return Err("unknown relay".into());
            };
            match signer.behaviour {
                Behaviour::Reject => Err("blocked: pow too low".into()),
                Behaviour::Silent => {
                    self.shards.lock().unwrap().push((signer.keys.public_key(), event.clone()));
                    Ok(())
                }
                Behaviour::Ack | Behaviour::StaleAck => {
                    self.shards.lock().unwrap().push((signer.keys.public_key(), event.clone()));
                    self.acknowledge(signer, event);
                    Ok(())
                }
            }
        }
    }

    impl Transport for MockNetwork {
        fn publish<'a>(&'a self, relays: &'a [String], event: &'a Event) -> BoxStream<'a, PublishOutcome> {
            stream::iter(relays.iter().map(move |relay| PublishOutcome {
                relay: relay.clone(),
                result: self.receive(relay, event),
            }))
            .boxed()
        }

        fn subscribe(&self, relays: &[String], filter: Filter) -> BoxStream<'static, Event> {
            let (tx, rx) = mpsc::unbounded();
            self.subscribers.lock().unwrap().push((filter, relays.to_vec(), tx));
            rx.boxed()
        }
    }

    #[derive(Default)]
    struct MinerStats {
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    /// Reports two steps of progress and returns the draft unchanged.
    struct InstantMiner {
        stats: Arc<MinerStats>,
    }

    impl PowMiner for InstantMiner {
        fn mine(
            &self,
            draft: UnsignedEvent,
            difficulty: u32,
            on_better_work: OnBetterWork,
        ) -> BoxFuture<'static, Result<UnsignedEvent, crate::net::NetError>> {
            let stats = Arc::clone(&self.stats);
            async move {
                let active = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
                stats.peak.fetch_max(active, Ordering::SeqCst);
                stats.calls.fetch_add(1, Ordering::SeqCst);
                on_better_work(difficulty / 2);
                tokio::task::yield_now().await;
                on_better_work(difficulty);
                stats.active.fetch_sub(1, Ordering::SeqCst);
                Ok(draft)
            }
            .boxed()
        }
    }

    type Outcomes = Arc<StdMutex<Vec<(PubKey, Option<DistributionError>)>>>;

    struct Harness {
        network: Arc<MockNetwork>,
        stats: Arc<MinerStats>,
        outcomes: Outcomes,
        progress: Arc<StdMutex<Vec<f64>>>,
        distributor: Distributor,
    }

    fn harness(network: MockNetwork) -> Harness {
        let network = Arc::new(network);
        let stats = Arc::new(MinerStats::default());
        let outcomes: Outcomes = Arc::default();
        let progress: Arc<StdMutex<Vec<f64>>> = Arc::default();

        let config = DistributorConfig {
            ack_timeout: Duration::from_millis(150),
            ..Default::default()
        };
        let outcome_sink = Arc::clone(&outcomes);
        let progress_sink = Arc::clone(&progress);
        let distributor = Distributor::new(
            network.clone(),
            Arc::new(InstantMiner { stats: Arc::clone(&stats) }),
            config,
        )
        .with_outcome(move |signer, err| outcome_sink.lock().unwrap().push((*signer, err.cloned())))
        .with_progress(move |p| progress_sink.lock().unwrap().push(p));

        Harness { network, stats, outcomes, progress, distributor }
    }

    fn request(network: &MockNetwork, threshold: u32, max_signers: u32) -> DistributionRequest {
        DistributionRequest {
            threshold,
            max_signers,
            candidates: network.candidates(),
            coordinator: COORDINATOR.into(),
            pow_difficulty: 8,
            inboxes: network.inboxes(),
            our_inbox: vec![OUR_INBOX.into()],
        }
    }

    #[tokio::test]
    async fn test_quorum_despite_silent_signers() {
        use Behaviour::*;
        let h = harness(MockNetwork::new(&[Silent, Ack, Silent, Ack, Ack]));
        let dealer = Keys::generate();
        let req = request(&h.network, 2, 3);

        let record = h.distributor.shard_and_distribute(&dealer, &req).await.unwrap();

        assert_eq!(record.signers.len(), 3);
        assert_eq!(record.threshold, 2);
        for (signer, _) in &record.signers {
            assert_eq!(h.network.signer(signer).behaviour, Ack);
        }

        let outcomes = h.outcomes.lock().unwrap();
        assert_eq!(outcomes.iter().filter(|(_, err)| err.is_none()).count(), 3);
        let failures: Vec<_> = outcomes.iter().filter_map(|(_, err)| err.clone()).collect();
        assert_eq!(failures, vec![DistributionError::DeliveryTimeout; 2]);

        assert_eq!(h.stats.peak.load(Ordering::SeqCst), 1);
        assert_eq!(h.stats.calls.load(Ordering::SeqCst), 5);

        let announcements = h.network.announcements.lock().unwrap();
        assert_eq!(announcements.len(), 1);
        assert_eq!(announcements[0], record.event);
        let parsed = CoordinationRecord::from_event(&announcements[0], 16430).unwrap();
        assert_eq!(parsed.signers, record.signers);

        let progress = h.progress.lock().unwrap();
        assert!(!progress.is_empty());
        assert!(progress.iter().all(|p| (0.0..=100.0).contains(p)));
    }

    #[tokio::test]
    async fn test_delivered_shares_reconstruct_dealer_key() {
        let h = harness(MockNetwork::new(&[Behaviour::Ack; 4]));
        let dealer = Keys::generate();
        let record = h
            .distributor
            .shard_and_distribute(&dealer, &request(&h.network, 3, 4))
            .await
            .unwrap();

        let shards = h.network.shards.lock().unwrap();
        assert_eq!(shards.len(), 4);

        let mut points = Vec::new();
        for (signer, shard) in shards.iter() {
            assert!(shard.verify());
            assert_eq!(shard.kind, 26428);
            assert_eq!(shard.first_tag("p").unwrap()[1], signer.to_hex());
            assert_eq!(shard.first_tag("coordinator").unwrap()[1], COORDINATOR);
            assert_eq!(shard.first_tag("reply").unwrap().len(), 5);

            let keys = &h.network.signer(signer).keys;
            let plain = cipher::decrypt(keys, &dealer.public_key(), &shard.content).unwrap();
            let share = KeyShare::from_hex(std::str::from_utf8(&plain).unwrap()).unwrap();
            assert!(verify_share(&share.public_share, &share.secret));
            assert!(record
                .signers
                .contains(&(*signer, share.public_share.to_hex())));
            points.push((share.id(), share.secret));
        }

        let secret = reconstruct_secret(&points[..3]).unwrap();
        assert_eq!(&compress(&mul_base(&secret))[1..], &dealer.public_key().as_bytes()[..]);

        let subscribers = h.network.subscribers.lock().unwrap();
        assert_eq!(subscribers.len(), 4);
        for (filter, relays, _) in subscribers.iter() {
            assert!(relays.contains(&OUR_INBOX.to_string()));
            let (_, shard) = shards
                .iter()
                .find(|(_, shard)| filter.e_tags == vec![shard.id_hex()])
                .unwrap();
            assert_eq!(filter.since, Some(shard.created_at - ACK_CLOCK_SKEW_SECS));
        }
    }

    #[tokio::test]
    async fn test_stale_acknowledgement_is_ignored() {
        use Behaviour::*;
        let h = harness(MockNetwork::new(&[StaleAck, Ack, Ack, Ack]));
        let candidates = h.network.candidates();
        let record = h
            .distributor
            .shard_and_distribute(&Keys::generate(), &request(&h.network, 2, 3))
            .await
            .unwrap();

        assert!(record.signers.iter().all(|(s, _)| *s != candidates[0]));
        let outcomes = h.outcomes.lock().unwrap();
        assert!(outcomes.contains(&(candidates[0], Some(DistributionError::DeliveryTimeout))));
    }

    #[tokio::test]
    async fn test_late_timeout_exhausts_budget() {
        use Behaviour::*;
        // 4 candidates for 3 shares: the second failure is fatal.
        let h = harness(MockNetwork::new(&[Silent, Reject, Ack, Ack]));
        let dealer = Keys::generate();

        let err = h
            .distributor
            .shard_and_distribute(&dealer, &request(&h.network, 2, 3))
            .await
            .unwrap_err();

        assert!(matches!(err, DistributionError::InsufficientSigners { required: 3, .. }));
        assert!(h.network.announcements.lock().unwrap().is_empty());
        let outcomes = h.outcomes.lock().unwrap();
        assert!(outcomes
            .iter()
            .any(|(_, e)| matches!(e, Some(DistributionError::PublishFailure(_)))));
    }

    #[tokio::test]
    async fn test_failure_budget_aborts() {
        use Behaviour::*;
        // 6 candidates for 3 shares: the fourth failure aborts while the two
        // acknowledging signers are still queued for mining.
        let h = harness(MockNetwork::new(&[Reject, Reject, Reject, Reject, Ack, Ack]));
        let candidates = h.network.candidates();

        let err = h
            .distributor
            .shard_and_distribute(&Keys::generate(), &request(&h.network, 2, 3))
            .await
            .unwrap_err();

        assert_eq!(err, DistributionError::InsufficientSigners { accepted: 0, required: 3 });
        assert_eq!(h.stats.calls.load(Ordering::SeqCst), 4);
        assert!(h.network.shards.lock().unwrap().is_empty());

        let outcomes = h.outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes
            .iter()
            .all(|(_, e)| matches!(e, Some(DistributionError::PublishFailure(_)))));
        for untouched in &candidates[4..] {
            assert!(outcomes.iter().all(|(s, _)| s != untouched));
        }
    }

    #[tokio::test]
    async fn test_no_claims_after_quorum() {
        let h = harness(MockNetwork::new(&[Behaviour::Ack; 5]));
        let dealer = Keys::generate();
        let record = h
            .distributor
            .shard_and_distribute(&dealer, &request(&h.network, 2, 3))
            .await
            .unwrap();

        assert_eq!(record.signers.len(), 3);
        assert_eq!(h.network.shards.lock().unwrap().len(), 3);
        assert_eq!(h.stats.calls.load(Ordering::SeqCst), 3);
        assert_eq!(h.outcomes.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_signers_are_skipped() {
        let h = harness(MockNetwork::new(&[Behaviour::Ack; 5]));
        let dealer = Keys::generate();
        let mut req = request(&h.network, 2, 3);
        let candidates = h.network.candidates();
        req.inboxes.remove(&candidates[0]);
        req.inboxes.insert(candidates[2], Vec::new());

        let record = h.distributor.shard_and_distribute(&dealer, &req).await.unwrap();

        let signers: Vec<PubKey> = record.signers.iter().map(|(s, _)| *s).collect();
        assert!(!signers.contains(&candidates[0]));
        assert!(!signers.contains(&candidates[2]));

        let outcomes = h.outcomes.lock().unwrap();
        let unreachable: Vec<PubKey> = outcomes
            .iter()
            .filter(|(_, e)| *e == Some(DistributionError::SignerUnreachable))
            .map(|(s, _)| *s)
            .collect();
        assert_eq!(unreachable, vec![candidates[0], candidates[2]]);
    }

    #[tokio::test]
    async fn test_coordinator_error_is_normalized() {
        for (reason, expected) in [
            ("blocked: rate-limited", "Error: blocked: rate-limited"),
            ("Error: duplicate", "Error: duplicate"),
        ] {
            let network = MockNetwork::new(&[Behaviour::Ack; 3]).rejecting_coordinator(reason);
            let h = harness(network);
            let err = h
                .distributor
                .shard_and_distribute(&Keys::generate(), &request(&h.network, 2, 3))
                .await
                .unwrap_err();
            assert_eq!(err, DistributionError::CoordinatorPublishFailure(expected.into()));
            assert_eq!(h.network.shards.lock().unwrap().len(), 3);
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_parameters() {
        let h = harness(MockNetwork::new(&[Behaviour::Ack; 2]));
        let dealer = Keys::generate();

        for (t, n) in [(0, 2), (3, 2)] {
            let err = h
                .distributor
                .shard_and_distribute(&dealer, &request(&h.network, t, n))
                .await
                .unwrap_err();
            assert_eq!(err, DistributionError::InvalidParameters);
        }

        let err = h
            .distributor
            .shard_and_distribute(&dealer, &request(&h.network, 2, 3))
            .await
            .unwrap_err();
        assert_eq!(err, DistributionError::InsufficientSigners { accepted: 0, required: 3 });

        // Duplicated candidates count once.
        let mut req = request(&h.network, 2, 3);
        req.candidates.push(req.candidates[0]);
        let err = h.distributor.shard_and_distribute(&dealer, &req).await.unwrap_err();
        assert_eq!(err, DistributionError::InsufficientSigners { accepted: 0, required: 3 });

        assert!(h.network.shards.lock().unwrap().is_empty());
    }
}
