//! Behaviour suites for the command engine.
