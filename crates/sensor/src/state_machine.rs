use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    BrokerConnecting,
    EngineLoading,
    SourceOpening,
    Running,
    Stopped,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Init => "INIT",
            PipelineState::BrokerConnecting => "BROKER_CONNECTING",
            PipelineState::EngineLoading => "ENGINE_LOADING",
            PipelineState::SourceOpening => "SOURCE_OPENING",
            PipelineState::Running => "RUNNING",
            PipelineState::Stopped => "STOPPED",
            PipelineState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Stopped | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    Start,
    BrokerConnected,
    EngineLoaded,
    SourceOpened,
    SourceOpenFailed,
    FrameProcessed,
    StreamEnded,
    ShutdownRequested,
    /// Any fatal condition; valid from every non-terminal state.
    Fault,
}

/// Orchestrator lifecycle. Events that do not apply to the current state
/// are ignored.
pub struct StateContext {
    current_state: PipelineState,
    fallback_available: bool,
    fallback_attempted: bool,
    history: Vec<PipelineState>,
}

impl StateContext {
    pub fn new(fallback_available: bool) -> Self {
        Self {
            current_state: PipelineState::Init,
            fallback_available,
            fallback_attempted: false,
            history: vec![PipelineState::Init],
        }
    }

    /// Applies `event`, returning the state entered, if any.
    ///
    /// The fallback re-entry of SOURCE_OPENING is reported as a transition
    /// even though the state is unchanged.
    pub fn update(&mut self, event: PipelineEvent) -> Option<PipelineState> {
        use PipelineEvent as E;
        use PipelineState as S;

        if self.current_state.is_terminal() {
            return None;
        }

        let next = match (self.current_state, event) {
            (_, E::Fault) => S::Failed,
            (S::Init, E::Start) => S::BrokerConnecting,
            (S::BrokerConnecting, E::BrokerConnected) => S::EngineLoading,
            (S::EngineLoading, E::EngineLoaded) => S::SourceOpening,
            (S::SourceOpening, E::SourceOpened) => S::Running,
            (S::SourceOpening, E::SourceOpenFailed) => {
                if self.fallback_available && !self.fallback_attempted {
                    self.fallback_attempted = true;
                    S::SourceOpening
                } else {
                    S::Failed
                }
            }
            (S::Running, E::FrameProcessed) => return None,
            (S::Running, E::StreamEnded | E::ShutdownRequested) => S::Stopped,
            _ => return None,
        };

        self.current_state = next;
        self.history.push(next);
        Some(next)
    }

    pub fn current_state(&self) -> PipelineState {
        self.current_state
    }

    /// True once the primary source has failed and the fallback is in play.
    pub fn on_fallback(&self) -> bool {
        self.fallback_attempted
    }

    /// Every state entered so far, starting with INIT.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineEvent as E;
    use PipelineState as S;

    fn running(fallback_available: bool) -> StateContext {
        let mut ctx = StateContext::new(fallback_available);
        ctx.update(E::Start);
        ctx.update(E::BrokerConnected);
        ctx.update(E::EngineLoaded);
        ctx.update(E::SourceOpened);
        ctx
    }

    // ========== Happy Path ==========

    #[test]
    fn new_starts_in_init() {
        let ctx = StateContext::new(true);
        assert_eq!(ctx.current_state(), S::Init);
        assert_eq!(ctx.history(), &[S::Init]);
        assert!(!ctx.on_fallback());
    }

    #[test]
    fn startup_sequence_reaches_running() {
        let mut ctx = StateContext::new(false);

        assert_eq!(ctx.update(E::Start), Some(S::BrokerConnecting));
        assert_eq!(ctx.update(E::BrokerConnected), Some(S::EngineLoading));
        assert_eq!(ctx.update(E::EngineLoaded), Some(S::SourceOpening));
        assert_eq!(ctx.update(E::SourceOpened), Some(S::Running));

        assert_eq!(
            ctx.history(),
            &[
                S::Init,
                S::BrokerConnecting,
                S::EngineLoading,
                S::SourceOpening,
                S::Running
            ]
        );
    }

    #[test]
    fn frames_keep_running_without_transition() {
        let mut ctx = running(false);
        for _ in 0..10 {
            assert!(ctx.update(E::FrameProcessed).is_none());
        }
        assert_eq!(ctx.current_state(), S::Running);
        assert_eq!(ctx.history().len(), 5);
    }

    #[test]
    fn stream_end_stops() {
        let mut ctx = running(false);
        assert_eq!(ctx.update(E::StreamEnded), Some(S::Stopped));
    }

    #[test]
    fn shutdown_stops() {
        let mut ctx = running(false);
        assert_eq!(ctx.update(E::ShutdownRequested), Some(S::Stopped));
    }

    // ========== Fallback ==========

    #[test]
    fn primary_failure_reenters_source_opening_once() {
        let mut ctx = StateContext::new(true);
        ctx.update(E::Start);
        ctx.update(E::BrokerConnected);
        ctx.update(E::EngineLoaded);

        assert_eq!(ctx.update(E::SourceOpenFailed), Some(S::SourceOpening));
        assert!(ctx.on_fallback());

        assert_eq!(ctx.update(E::SourceOpened), Some(S::Running));
        assert!(!ctx.history().contains(&S::Failed));
    }

    #[test]
    fn fallback_failure_fails() {
        let mut ctx = StateContext::new(true);
        ctx.update(E::Start);
        ctx.update(E::BrokerConnected);
        ctx.update(E::EngineLoaded);
        ctx.update(E::SourceOpenFailed);

        assert_eq!(ctx.update(E::SourceOpenFailed), Some(S::Failed));
    }

    #[test]
    fn primary_failure_without_fallback_fails() {
        let mut ctx = StateContext::new(false);
        ctx.update(E::Start);
        ctx.update(E::BrokerConnected);
        ctx.update(E::EngineLoaded);

        assert_eq!(ctx.update(E::SourceOpenFailed), Some(S::Failed));
        assert!(!ctx.on_fallback());
    }

    // ========== Failures ==========

    #[test]
    fn fault_from_every_non_terminal_state() {
        let steps = [E::Start, E::BrokerConnected, E::EngineLoaded, E::SourceOpened];

        for depth in 0..=steps.len() {
            let mut ctx = StateContext::new(true);
            for event in &steps[..depth] {
                ctx.update(*event);
            }
            assert!(!ctx.current_state().is_terminal());
            assert_eq!(ctx.update(E::Fault), Some(S::Failed), "depth {depth}");
        }
    }

    #[test]
    fn broker_failure_skips_later_states() {
        let mut ctx = StateContext::new(true);
        ctx.update(E::Start);
        ctx.update(E::Fault);

        assert_eq!(ctx.history(), &[S::Init, S::BrokerConnecting, S::Failed]);
    }

    // ========== Terminal States ==========

    #[test]
    fn terminal_states_ignore_events() {
        let mut stopped = running(false);
        stopped.update(E::StreamEnded);

        let mut failed = StateContext::new(false);
        failed.update(E::Fault);

        for ctx in [&mut stopped, &mut failed] {
            let before = ctx.current_state();
            for event in [E::Start, E::SourceOpened, E::Fault, E::ShutdownRequested] {
                assert!(ctx.update(event).is_none());
            }
            assert_eq!(ctx.current_state(), before);
        }
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let mut ctx = StateContext::new(false);

        assert!(ctx.update(E::EngineLoaded).is_none());
        assert!(ctx.update(E::SourceOpened).is_none());
        assert!(ctx.update(E::StreamEnded).is_none());
        assert_eq!(ctx.current_state(), S::Init);

        ctx.update(E::Start);
        assert!(ctx.update(E::ShutdownRequested).is_none());
        assert_eq!(ctx.current_state(), S::BrokerConnecting);
    }

    #[test]
    fn display_uses_upper_snake_case() {
        assert_eq!(S::BrokerConnecting.to_string(), "BROKER_CONNECTING");
        assert_eq!(S::Failed.to_string(), "FAILED");
    }
}
