use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SequencerSettings;
use crate::domain::{
    parse_principal, LendingAction, LendingRequest, StepStatus, StrategyKind, StrategyPlan,
};
use crate::error::{FinAgentError, Result};
use crate::gateway::LendingGateway;

use super::cancel::CancelFlag;
use super::run::StrategyRun;

/// Pacing for a sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Pause between consecutive steps
    pub step_delay: Duration,
    /// How long a finished successful run stays visible before reset
    pub cooldown: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_secs(1),
            cooldown: Duration::from_secs(5),
        }
    }
}

impl From<&SequencerSettings> for SequencerConfig {
    fn from(settings: &SequencerSettings) -> Self {
        Self {
            step_delay: settings.step_delay(),
            cooldown: settings.cooldown(),
        }
    }
}

/// A confirmed lending call made by one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReceipt {
    pub step: u32,
    pub action: LendingAction,
    pub amount: String,
    pub tx_hash: String,
}

/// Result of a run that completed every step
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub strategy: StrategyKind,
    pub receipts: Vec<StepReceipt>,
    pub message: String,
}

struct Shared {
    plan: StrategyPlan,
    gateway: Arc<dyn LendingGateway>,
    config: SequencerConfig,
    state: watch::Sender<StrategyRun>,
    in_progress: AtomicBool,
    generation: AtomicU64,
    active_cancel: Mutex<Option<CancelFlag>>,
}

impl Shared {
    fn update(&self, f: impl FnOnce(&mut StrategyRun)) {
        self.state.send_modify(f);
    }

    fn set_step(&self, number: u32, status: StepStatus, tx_hash: Option<String>) -> Result<()> {
        let mut outcome = Ok(());
        self.state
            .send_modify(|run| outcome = run.set_step_status(number, status, tx_hash));
        outcome
    }

    fn set_active_cancel(&self, flag: Option<CancelFlag>) {
        if let Ok(mut slot) = self.active_cancel.lock() {
            *slot = flag;
        }
    }
}

/// Executes one strategy's steps strictly in order against a lending gateway.
///
/// Cheap to clone; clones drive the same run state. At most one run is in
/// progress per sequencer.
#[derive(Clone)]
pub struct StepSequencer {
    shared: Arc<Shared>,
}

impl StepSequencer {
    pub fn new(plan: StrategyPlan, gateway: Arc<dyn LendingGateway>, config: SequencerConfig) -> Self {
        let (state, _) = watch::channel(StrategyRun::new(&plan));
        Self {
            shared: Arc::new(Shared {
                plan,
                gateway,
                config,
                state,
                in_progress: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                active_cancel: Mutex::new(None),
            }),
        }
    }

    pub fn for_strategy(
        kind: StrategyKind,
        settings: &SequencerSettings,
        gateway: Arc<dyn LendingGateway>,
    ) -> Self {
        Self::new(
            kind.plan(settings.fraction_for(kind)),
            gateway,
            SequencerConfig::from(settings),
        )
    }

    pub fn plan(&self) -> &StrategyPlan {
        &self.shared.plan
    }

    pub fn kind(&self) -> StrategyKind {
        self.shared.plan.kind
    }

    pub fn config(&self) -> SequencerConfig {
        self.shared.config
    }

    pub fn is_running(&self) -> bool {
        self.shared.in_progress.load(Ordering::SeqCst)
    }

    /// Current state of the step list
    pub fn snapshot(&self) -> StrategyRun {
        self.shared.state.borrow().clone()
    }

    /// Receive every state change as it happens
    pub fn subscribe(&self) -> watch::Receiver<StrategyRun> {
        self.shared.state.subscribe()
    }

    /// Request cancellation of the run in progress, if any
    pub fn cancel_active(&self) -> bool {
        match self.shared.active_cancel.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(flag) => {
                    flag.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Validate the amount and claim the sequencer.
    ///
    /// Returns a run that has been marked in progress with every step
    /// pending; nothing is sent until [`PreparedRun::execute`] is awaited.
    pub fn start(&self, amount: Option<&str>, cancel: CancelFlag) -> Result<PreparedRun> {
        let principal = parse_principal(amount)?;
        let raw_amount = amount.map(str::trim).unwrap_or_default().to_string();

        let guard = InProgressGuard::acquire(&self.shared)?;
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let run_id = Uuid::new_v4();

        self.shared.set_active_cancel(Some(cancel.clone()));
        self.shared.update(|run| run.begin(run_id, &raw_amount));

        info!(
            strategy = %self.kind(),
            run_id = %run_id,
            amount = %raw_amount,
            "Strategy run accepted"
        );

        Ok(PreparedRun {
            shared: Arc::clone(&self.shared),
            _guard: guard,
            run_id,
            generation,
            raw_amount,
            principal,
            cancel,
        })
    }

    /// Run every step to completion, first failure, or cancellation
    pub async fn run(&self, amount: Option<&str>, cancel: CancelFlag) -> Result<RunOutcome> {
        self.start(amount, cancel)?.execute().await
    }
}

/// Releases the in-progress claim when the run finishes or is dropped.
struct InProgressGuard {
    shared: Arc<Shared>,
}

impl InProgressGuard {
    fn acquire(shared: &Arc<Shared>) -> Result<Self> {
        shared
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| FinAgentError::RunInProgress)?;
        Ok(Self {
            shared: Arc::clone(shared),
        })
    }
}

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        self.shared.state.send_if_modified(|run| {
            if run.is_running() {
                run.abandon();
                true
            } else {
                false
            }
        });
        self.shared.set_active_cancel(None);
        self.shared.in_progress.store(false, Ordering::SeqCst);
    }
}

/// A run that holds the sequencer but has not sent anything yet
pub struct PreparedRun {
    shared: Arc<Shared>,
    _guard: InProgressGuard,
    run_id: Uuid,
    generation: u64,
    raw_amount: String,
    principal: f64,
    cancel: CancelFlag,
}

impl PreparedRun {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub async fn execute(self) -> Result<RunOutcome> {
        let shared = Arc::clone(&self.shared);
        let plan = &shared.plan;
        let mut receipts = Vec::with_capacity(plan.steps.len());

        for (idx, template) in plan.steps.iter().enumerate() {
            let number = idx as u32 + 1;

            if idx > 0 && !shared.config.step_delay.is_zero() {
                tokio::time::sleep(shared.config.step_delay).await;
            }

            if self.cancel.is_cancelled() {
                warn!(run_id = %self.run_id, step = number, "Run cancelled before step");
                shared.update(|run| run.cancel());
                return Err(FinAgentError::Cancelled);
            }

            let request = LendingRequest::new(
                template.action,
                plan.amount_for(template, &self.raw_amount, self.principal),
            );

            shared.set_step(number, StepStatus::Loading, None)?;
            info!(
                run_id = %self.run_id,
                step = number,
                action = %request.action,
                amount = %request.amount,
                "Executing {}",
                template.title
            );

            let result = shared.gateway.execute(&request).await.and_then(|receipt| {
                if receipt.is_rejected() {
                    Err(FinAgentError::LendingRejected {
                        status: 200,
                        message: "Lending endpoint reported failure".to_string(),
                    })
                } else {
                    Ok(receipt)
                }
            });

            match result {
                Ok(receipt) => {
                    debug!(step = number, tx_hash = %receipt.tx_hash, "Step confirmed");
                    shared.set_step(number, StepStatus::Complete, Some(receipt.tx_hash.clone()))?;
                    receipts.push(StepReceipt {
                        step: number,
                        action: request.action,
                        amount: request.amount,
                        tx_hash: receipt.tx_hash,
                    });
                }
                Err(e) => {
                    let message = e.user_message();
                    error!(run_id = %self.run_id, step = number, "{} failed: {}", template.title, message);
                    shared.set_step(number, StepStatus::Error, None)?;
                    shared.update(|run| run.fail(message.clone()));
                    return Err(FinAgentError::StepFailed {
                        step: number,
                        title: template.title.clone(),
                        message,
                    });
                }
            }
        }

        let message = plan.success_message();
        shared.update(|run| run.succeed(message.clone()));
        info!(run_id = %self.run_id, "{}", message);

        schedule_reset(Arc::downgrade(&shared), self.generation);

        Ok(RunOutcome {
            run_id: self.run_id,
            strategy: plan.kind,
            receipts,
            message,
        })
    }
}

/// Return the surface to idle once the cooldown elapses, unless a newer run
/// has started in the meantime.
fn schedule_reset(shared: Weak<Shared>, generation: u64) {
    let cooldown = match shared.upgrade() {
        Some(s) => s.config.cooldown,
        None => return,
    };

    tokio::spawn(async move {
        tokio::time::sleep(cooldown).await;
        let Some(shared) = shared.upgrade() else {
            return;
        };
        if shared.generation.load(Ordering::SeqCst) != generation {
            debug!("Skipping reset, a newer run has started");
            return;
        }
        shared.state.send_if_modified(|run| {
            if run.is_running() {
                false
            } else {
                run.reset();
                true
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LendingReceipt;
    use crate::gateway::MockLendingGateway;
    use crate::sequencer::RunPhase;
    use mockall::Sequence;
    use StepStatus::*;

    const LONG: Duration = Duration::from_secs(3600);

    fn config(cooldown: Duration) -> SequencerConfig {
        SequencerConfig {
            step_delay: Duration::ZERO,
            cooldown,
        }
    }

    fn receipt(hash: &str) -> LendingReceipt {
        LendingReceipt {
            tx_hash: hash.to_string(),
            success: Some(true),
        }
    }

    fn expect_call(
        mock: &mut MockLendingGateway,
        seq: &mut Sequence,
        action: LendingAction,
        amount: &'static str,
        result: Result<LendingReceipt>,
    ) {
        let mut result = Some(result);
        mock.expect_execute()
            .withf(move |req| req.action == action && req.amount == amount)
            .times(1)
            .in_sequence(seq)
            .returning(move |_| {
                result
                    .take()
                    .unwrap_or_else(|| Err(FinAgentError::Internal("called twice".into())))
            });
    }

    fn bullish(mock: MockLendingGateway, cooldown: Duration) -> StepSequencer {
        StepSequencer::new(
            StrategyKind::Bullish.plan(0.3),
            Arc::new(mock),
            config(cooldown),
        )
    }

    #[tokio::test]
    async fn leveraged_run_sends_supply_borrow_supply() {
        let mut mock = MockLendingGateway::new();
        let mut seq = Sequence::new();
        expect_call(&mut mock, &mut seq, LendingAction::Supply, "1000", Ok(receipt("0xaaa")));
        expect_call(&mut mock, &mut seq, LendingAction::Borrow, "300", Ok(receipt("0xbbb")));
        expect_call(&mut mock, &mut seq, LendingAction::Supply, "300", Ok(receipt("0xccc")));

        let sequencer = bullish(mock, LONG);
        let outcome = sequencer.run(Some("1000"), CancelFlag::new()).await.unwrap();

        let hashes: Vec<_> = outcome.receipts.iter().map(|r| r.tx_hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xaaa", "0xbbb", "0xccc"]);
        assert_eq!(
            outcome.message,
            "Bullish Strategy successfully executed! All steps completed."
        );

        let state = sequencer.snapshot();
        assert_eq!(state.phase, RunPhase::Succeeded);
        assert_eq!(state.statuses(), vec![Complete, Complete, Complete]);
        assert_eq!(
            state.completed_transactions(),
            vec![(1, "0xaaa"), (2, "0xbbb"), (3, "0xccc")]
        );
        assert!(!sequencer.is_running());
    }

    #[tokio::test]
    async fn first_step_failure_leaves_later_steps_pending() {
        let mut mock = MockLendingGateway::new();
        let mut seq = Sequence::new();
        expect_call(
            &mut mock,
            &mut seq,
            LendingAction::Supply,
            "100",
            Err(FinAgentError::LendingRejected {
                status: 500,
                message: "HTTP error! status: 500".into(),
            }),
        );

        let sequencer = bullish(mock, LONG);
        let err = sequencer.run(Some("100"), CancelFlag::new()).await.unwrap_err();

        match err {
            FinAgentError::StepFailed { step, message, .. } => {
                assert_eq!(step, 1);
                assert_eq!(message, "HTTP error! status: 500");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let state = sequencer.snapshot();
        assert_eq!(state.phase, RunPhase::Failed);
        assert_eq!(state.statuses(), vec![Error, Pending, Pending]);
        assert_eq!(state.error.as_deref(), Some("HTTP error! status: 500"));
        assert!(!sequencer.is_running());
    }

    #[tokio::test]
    async fn explicit_success_false_fails_the_step() {
        let mut mock = MockLendingGateway::new();
        let mut seq = Sequence::new();
        expect_call(&mut mock, &mut seq, LendingAction::Supply, "1000", Ok(receipt("0xaaa")));
        expect_call(
            &mut mock,
            &mut seq,
            LendingAction::Borrow,
            "300",
            Ok(LendingReceipt {
                tx_hash: "0xbad".into(),
                success: Some(false),
            }),
        );

        let sequencer = bullish(mock, LONG);
        let err = sequencer.run(Some("1000"), CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, FinAgentError::StepFailed { step: 2, .. }));

        let state = sequencer.snapshot();
        assert_eq!(state.statuses(), vec![Complete, Error, Pending]);
        assert_eq!(state.completed_transactions(), vec![(1, "0xaaa")]);
    }

    #[tokio::test]
    async fn invalid_amounts_send_nothing() {
        let mut mock = MockLendingGateway::new();
        mock.expect_execute().times(0);
        let sequencer = bullish(mock, LONG);

        for amount in [None, Some(""), Some("0"), Some("-5"), Some("abc")] {
            let err = sequencer.run(amount, CancelFlag::new()).await.unwrap_err();
            assert!(err.is_validation(), "{amount:?} should be rejected");
        }
        assert_eq!(sequencer.snapshot().phase, RunPhase::Idle);
        assert!(!sequencer.is_running());
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_running() {
        let mut mock = MockLendingGateway::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(receipt("0xaaa")));
        let sequencer = StepSequencer::new(
            StrategyKind::Buffet.plan(0.3),
            Arc::new(mock),
            config(LONG),
        );

        let prepared = sequencer.start(Some("50"), CancelFlag::new()).unwrap();
        assert!(sequencer.is_running());
        let err = sequencer.start(Some("60"), CancelFlag::new()).err().unwrap();
        assert!(matches!(err, FinAgentError::RunInProgress));

        prepared.execute().await.unwrap();
        assert!(!sequencer.is_running());
        assert_eq!(sequencer.snapshot().amount.as_deref(), Some("50"));
    }

    #[tokio::test]
    async fn cancelled_run_stops_before_next_step() {
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();

        let mut mock = MockLendingGateway::new();
        mock.expect_execute().times(1).returning(move |_| {
            trigger.cancel();
            Ok(receipt("0xaaa"))
        });

        let sequencer = bullish(mock, LONG);
        let err = sequencer.run(Some("1000"), cancel).await.unwrap_err();
        assert!(matches!(err, FinAgentError::Cancelled));

        let state = sequencer.snapshot();
        assert_eq!(state.phase, RunPhase::Cancelled);
        assert_eq!(state.statuses(), vec![Complete, Pending, Pending]);
        assert!(!sequencer.is_running());
    }

    #[tokio::test]
    async fn cancel_active_reaches_the_running_flag() {
        let mut mock = MockLendingGateway::new();
        mock.expect_execute().times(0);
        let sequencer = bullish(mock, LONG);

        assert!(!sequencer.cancel_active());
        let prepared = sequencer.start(Some("10"), CancelFlag::new()).unwrap();
        assert!(sequencer.cancel_active());
        assert!(prepared.cancel_flag().is_cancelled());

        assert!(matches!(
            prepared.execute().await.unwrap_err(),
            FinAgentError::Cancelled
        ));
        assert!(!sequencer.cancel_active());
    }

    #[tokio::test]
    async fn dropping_a_prepared_run_releases_the_sequencer() {
        let mut mock = MockLendingGateway::new();
        mock.expect_execute().times(0);
        let sequencer = bullish(mock, LONG);

        let prepared = sequencer.start(Some("10"), CancelFlag::new()).unwrap();
        drop(prepared);

        assert!(!sequencer.is_running());
        assert_eq!(sequencer.snapshot().phase, RunPhase::Cancelled);
        assert!(sequencer.start(Some("10"), CancelFlag::new()).is_ok());
    }

    #[tokio::test]
    async fn never_more_than_one_step_loading() {
        let mut mock = MockLendingGateway::new();
        mock.expect_execute()
            .times(3)
            .returning(|_| Ok(receipt("0x1")));
        let sequencer = StepSequencer::new(
            StrategyKind::Bullish.plan(0.3),
            Arc::new(mock),
            SequencerConfig {
                step_delay: Duration::from_millis(1),
                cooldown: LONG,
            },
        );

        let mut rx = sequencer.subscribe();
        let observer = tokio::spawn(async move {
            let mut max_loading = 0;
            while rx.changed().await.is_ok() {
                let run = rx.borrow_and_update().clone();
                max_loading = max_loading.max(run.loading_count());
                if run.phase.is_finished() {
                    break;
                }
            }
            max_loading
        });

        sequencer.run(Some("1000"), CancelFlag::new()).await.unwrap();
        assert!(observer.await.unwrap() <= 1);

        let transitions = sequencer.snapshot().transitions;
        let steps: Vec<u32> = transitions.iter().map(|t| t.step).collect();
        assert_eq!(steps, vec![1, 1, 2, 2, 3, 3]);
    }

    #[tokio::test]
    async fn successful_run_resets_after_cooldown() {
        let mut mock = MockLendingGateway::new();
        mock.expect_execute()
            .times(3)
            .returning(|_| Ok(receipt("0x1")));
        let sequencer = bullish(mock, Duration::from_millis(20));

        sequencer.run(Some("1000"), CancelFlag::new()).await.unwrap();
        assert_eq!(sequencer.snapshot().phase, RunPhase::Succeeded);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let state = sequencer.snapshot();
        assert_eq!(state.phase, RunPhase::Idle);
        assert!(state.amount.is_none());
        assert_eq!(state.statuses(), vec![Pending, Pending, Pending]);
    }

    #[tokio::test]
    async fn stale_reset_does_not_clobber_newer_run() {
        let mut mock = MockLendingGateway::new();
        mock.expect_execute()
            .times(3)
            .returning(|_| Ok(receipt("0x1")));
        let sequencer = bullish(mock, Duration::from_millis(20));

        sequencer.run(Some("1000"), CancelFlag::new()).await.unwrap();
        let second = sequencer.start(Some("500"), CancelFlag::new()).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let state = sequencer.snapshot();
        assert_eq!(state.phase, RunPhase::Running);
        assert_eq!(state.amount.as_deref(), Some("500"));
        drop(second);
    }

    #[tokio::test]
    async fn failed_run_is_not_reset() {
        let mut mock = MockLendingGateway::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Err(FinAgentError::LendingRejected {
                status: 400,
                message: "Insufficient collateral".into(),
            }));
        let sequencer = bullish(mock, Duration::from_millis(20));

        assert!(sequencer.run(Some("1000"), CancelFlag::new()).await.is_err());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let state = sequencer.snapshot();
        assert_eq!(state.phase, RunPhase::Failed);
        assert_eq!(state.error.as_deref(), Some("Insufficient collateral"));
    }

    #[tokio::test]
    async fn moon_sends_raw_principal_and_two_decimal_borrow() {
        let mut mock = MockLendingGateway::new();
        let mut seq = Sequence::new();
        expect_call(&mut mock, &mut seq, LendingAction::Supply, "12.5", Ok(receipt("0xm1")));
        expect_call(&mut mock, &mut seq, LendingAction::Borrow, "3.75", Ok(receipt("0xm2")));
        expect_call(&mut mock, &mut seq, LendingAction::Supply, "3.75", Ok(receipt("0xm3")));
        let sequencer = StepSequencer::new(
            StrategyKind::Moon.plan(0.3),
            Arc::new(mock),
            config(LONG),
        );

        let outcome = sequencer.run(Some(" 12.5 "), CancelFlag::new()).await.unwrap();
        let amounts: Vec<_> = outcome.receipts.iter().map(|r| r.amount.as_str()).collect();
        assert_eq!(amounts, ["12.5", "3.75", "3.75"]);
        let hashes: Vec<_> = outcome.receipts.iter().map(|r| r.tx_hash.as_str()).collect();
        assert_eq!(hashes, ["0xm1", "0xm2", "0xm3"]);
        assert_eq!(sequencer.snapshot().statuses(), vec![Complete, Complete, Complete]);
    }

    #[tokio::test]
    async fn moon_rounds_borrow_to_cents() {
        let mut mock = MockLendingGateway::new();
        let mut seq = Sequence::new();
        expect_call(&mut mock, &mut seq, LendingAction::Supply, "100", Ok(receipt("0xm1")));
        expect_call(&mut mock, &mut seq, LendingAction::Borrow, "30.00", Ok(receipt("0xm2")));
        expect_call(&mut mock, &mut seq, LendingAction::Supply, "30.00", Ok(receipt("0xm3")));
        let sequencer = StepSequencer::new(
            StrategyKind::Moon.plan(0.3),
            Arc::new(mock),
            config(LONG),
        );

        let outcome = sequencer.run(Some("100"), CancelFlag::new()).await.unwrap();
        assert_eq!(outcome.receipts.len(), 3);
    }
}
