use serde::Serialize;
use statig::prelude::*;
use std::fmt;

/// Top-level screen a session is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Input,
    Signup,
    Processing,
    Download,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Signup => "signup",
            Stage::Processing => "processing",
            Stage::Download => "download",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    IntakeAccepted,
    AccountVerified,
    JobCompleted,
    Reset,
}

/// Stage bookkeeping for one session. Events that do not apply to the
/// current stage are ignored.
#[derive(Debug, Default)]
pub struct SessionStateMachine {
    session_id: String,
    stage: Stage,
    transitions: u32,
}

impl SessionStateMachine {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    fn enter(&mut self, stage: Stage) {
        tracing::info!(
            session_id = %self.session_id,
            from = %self.stage,
            to = %stage,
            "Session stage changed"
        );
        self.stage = stage;
        self.transitions += 1;
    }
}

#[state_machine(initial = "State::input()", state(derive(Debug, Clone, PartialEq, Eq)))]
impl SessionStateMachine {
    #[state]
    fn input(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::IntakeAccepted => {
                self.enter(Stage::Signup);
                Transition(State::signup())
            }
            _ => Handled,
        }
    }

    #[state]
    fn signup(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::AccountVerified => {
                self.enter(Stage::Processing);
                Transition(State::processing())
            }
            SessionEvent::Reset => {
                self.enter(Stage::Input);
                Transition(State::input())
            }
            _ => Handled,
        }
    }

    #[state]
    fn processing(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::JobCompleted => {
                self.enter(Stage::Download);
                Transition(State::download())
            }
            SessionEvent::Reset => {
                self.enter(Stage::Input);
                Transition(State::input())
            }
            _ => Handled,
        }
    }

    #[state]
    fn download(&mut self, event: &SessionEvent) -> Outcome<State> {
        match event {
            SessionEvent::Reset => {
                self.enter(Stage::Input);
                Transition(State::input())
            }
            _ => Handled,
        }
    }
}

/// Owns the running statig machine for a session
pub struct SessionFlow {
    machine: StateMachine<SessionStateMachine>,
}

impl SessionFlow {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            machine: SessionStateMachine::new(session_id).state_machine(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.machine.inner().stage()
    }

    /// Feed an event; returns true when the stage changed
    pub fn apply(&mut self, event: SessionEvent) -> bool {
        let before = self.machine.inner().transitions();
        self.machine.handle(&event);
        self.machine.inner().transitions() != before
    }
}

impl fmt::Debug for SessionFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFlow").field("stage", &self.stage()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_every_stage() {
        let mut flow = SessionFlow::new("session-1");
        assert_eq!(flow.stage(), Stage::Input);

        assert!(flow.apply(SessionEvent::IntakeAccepted));
        assert_eq!(flow.stage(), Stage::Signup);
        assert!(flow.apply(SessionEvent::AccountVerified));
        assert_eq!(flow.stage(), Stage::Processing);
        assert!(flow.apply(SessionEvent::JobCompleted));
        assert_eq!(flow.stage(), Stage::Download);
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let mut flow = SessionFlow::new("session-2");

        assert!(!flow.apply(SessionEvent::JobCompleted));
        assert!(!flow.apply(SessionEvent::AccountVerified));
        assert_eq!(flow.stage(), Stage::Input);

        flow.apply(SessionEvent::IntakeAccepted);
        assert!(!flow.apply(SessionEvent::JobCompleted));
        assert_eq!(flow.stage(), Stage::Signup);
    }

    #[test]
    fn reset_returns_to_input_from_anywhere() {
        let mut flow = SessionFlow::new("session-3");
        assert!(!flow.apply(SessionEvent::Reset));

        flow.apply(SessionEvent::IntakeAccepted);
        flow.apply(SessionEvent::AccountVerified);
        flow.apply(SessionEvent::JobCompleted);
        assert!(flow.apply(SessionEvent::Reset));
        assert_eq!(flow.stage(), Stage::Input);

        assert!(flow.apply(SessionEvent::IntakeAccepted));
        assert_eq!(flow.stage(), Stage::Signup);
    }
}
