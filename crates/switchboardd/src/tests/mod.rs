//! Behavioural tests for the daemon.
