//! Token lifecycle control.
//!
//! One controller owns one [`TokenState`]. Lifecycle:
//! Idle → Pending (execute) → {Ready, Error} → Pending (renewal or manual
//! re-execute) → Idle (reset). Error is non-terminal; a later execute
//! retries.
//!
//! Every execute and reset advances an epoch counter. A provider response
//! that completes under a stale epoch is discarded without touching state,
//! so a reset can never be overwritten by an in-flight request.

use std::sync::Arc;
use tokio::sync::{RwLock, broadcast, watch};
use tokio::time::{Duration, Instant};

use aegis_common::{AegisError, FieldValue, TokenEvent, TokenState};

use crate::config::RecaptchaConfig;
use crate::events::EventEmitter;
use crate::token::provider::TokenProvider;
use crate::validation::ValidationRule;

/// A scheduled token renewal.
///
/// Carries the action and bound field value of the execution that
/// scheduled it, so the renewal re-runs under the same context.
#[derive(Clone, Debug)]
pub struct RefreshOrder {
    pub action: String,
    pub field_value: Option<FieldValue>,
    pub epoch: u64,
    pub deadline: Instant,
}

struct Inner {
    state: TokenState,
    epoch: u64,
}

/// Token lifecycle controller
pub struct TokenController {
    config: RecaptchaConfig,
    provider: Arc<dyn TokenProvider>,
    validator: Arc<dyn ValidationRule>,
    emitter: Arc<EventEmitter>,
    inner: RwLock<Inner>,
    /// Single renewal slot; at most one pending deadline at any time
    refresh_tx: watch::Sender<Option<RefreshOrder>>,
}

impl TokenController {
    pub fn new(
        config: RecaptchaConfig,
        provider: Arc<dyn TokenProvider>,
        validator: Arc<dyn ValidationRule>,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        let (refresh_tx, _) = watch::channel(None);
        Self {
            config,
            provider,
            validator,
            emitter,
            inner: RwLock::new(Inner {
                state: TokenState::new(),
                epoch: 0,
            }),
            refresh_tx,
        }
    }

    /// Current state snapshot
    pub async fn snapshot(&self) -> TokenState {
        self.inner.read().await.state.clone()
    }

    /// Subscribe to the renewal slot (consumed by [`refresh_worker`])
    pub fn subscribe_refresh(&self) -> watch::Receiver<Option<RefreshOrder>> {
        self.refresh_tx.subscribe()
    }

    /// Execute a token request.
    ///
    /// Falls back to the configured action when none is given. Runs the
    /// validation gate first when custom validation is on; a rejection
    /// makes no provider call. On success, schedules a renewal when auto
    /// refresh is on.
    pub async fn execute(
        &self,
        action: Option<String>,
        field_value: Option<FieldValue>,
    ) -> Result<String, AegisError> {
        let action = action.unwrap_or_else(|| self.config.action.clone());

        // Missing site key fails this call only; state is untouched.
        if self.config.site_key.trim().is_empty() {
            return Err(AegisError::Config("site_key is not configured".to_string()));
        }

        // New cycle: supersedes any in-flight execution and pending renewal.
        let epoch = self.begin_cycle().await;

        if self.config.custom_validation {
            let expression = self.config.validation_expression.as_deref().unwrap_or("");
            let bound = field_value.clone().unwrap_or(FieldValue::Null);
            if !self.validator.evaluate(expression, &bound) {
                let err = AegisError::ValidationRejected(
                    "validation formula returned false".to_string(),
                );
                return self.commit_failure(epoch, err).await;
            }
            tracing::debug!(action = %action, "Validation formula passed");
        }

        match self.provider.issue(&self.config.site_key, &action).await {
            // Ready always holds a non-empty token, whatever the provider says
            Ok(token) if token.is_empty() => {
                let err = AegisError::Provider("provider returned an empty token".to_string());
                self.commit_failure(epoch, err).await
            }
            Ok(token) => self.commit_success(epoch, action, field_value, token).await,
            Err(err) => self.commit_failure(epoch, err).await,
        }
    }

    /// Cancel any pending renewal and return the state to Idle,
    /// discarding the current token
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.epoch += 1;
        inner.state.clear();
        self.refresh_tx.send_replace(None);
        tracing::debug!("Controller reset to idle");
    }

    async fn begin_cycle(&self) -> u64 {
        let mut inner = self.inner.write().await;
        inner.epoch += 1;
        inner.state.mark_pending();
        self.refresh_tx.send_replace(None);
        inner.epoch
    }

    async fn commit_success(
        &self,
        epoch: u64,
        action: String,
        field_value: Option<FieldValue>,
        token: String,
    ) -> Result<String, AegisError> {
        {
            let mut inner = self.inner.write().await;
            if inner.epoch != epoch {
                tracing::debug!(action = %action, "Discarding stale provider response");
                return Err(AegisError::Superseded(
                    "result discarded after reset or newer execution".to_string(),
                ));
            }

            inner
                .state
                .mark_ready(token.clone(), chrono::Utc::now().timestamp());

            if self.config.auto_refresh {
                let deadline =
                    Instant::now() + Duration::from_secs(self.config.refresh_interval_secs);
                self.refresh_tx.send_replace(Some(RefreshOrder {
                    action: action.clone(),
                    field_value,
                    epoch,
                    deadline,
                }));
            }
        }

        tracing::info!(action = %action, "Token issued");
        self.emitter.emit(&TokenEvent::Generated {
            token: token.clone(),
        });
        Ok(token)
    }

    async fn commit_failure(&self, epoch: u64, err: AegisError) -> Result<String, AegisError> {
        let message = err.to_string();
        {
            let mut inner = self.inner.write().await;
            if inner.epoch != epoch {
                return Err(AegisError::Superseded(
                    "result discarded after reset or newer execution".to_string(),
                ));
            }
            inner.state.mark_failed(message.clone());
        }

        tracing::warn!(error = %message, "Token execution failed");
        self.emitter.emit(&TokenEvent::Failed { error: message });
        Err(err)
    }

    /// Run a due renewal order. Skips (and clears) orders made stale by a
    /// reset or newer execution in the meantime.
    async fn run_refresh(&self, order: RefreshOrder) {
        let stale = {
            let inner = self.inner.read().await;
            inner.epoch != order.epoch
        };
        if stale {
            tracing::debug!(action = %order.action, "Skipping stale renewal order");
            self.refresh_tx.send_if_modified(|slot| match slot {
                Some(current) if current.epoch == order.epoch => {
                    *slot = None;
                    true
                }
                _ => false,
            });
            return;
        }

        tracing::debug!(action = %order.action, "Auto-refreshing token");
        if let Err(e) = self.execute(Some(order.action), order.field_value).await {
            tracing::warn!(error = %e, "Auto-refresh failed");
        }
    }
}

/// Background worker that fires scheduled renewals.
///
/// One per controller. Sleeps until the current order's deadline,
/// re-executes, and goes back to waiting; a replaced or cleared order
/// restarts the wait.
pub async fn refresh_worker(
    controller: Arc<TokenController>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!("⏱️ Refresh worker started");
    let mut orders = controller.subscribe_refresh();

    loop {
        let order = orders.borrow_and_update().clone();
        match order {
            Some(order) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(order.deadline) => {
                        controller.run_refresh(order).await;
                    }
                    changed = orders.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            None => {
                tokio::select! {
                    changed = orders.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        }
    }

    tracing::info!("⏱️ Refresh worker shutting down");
}
