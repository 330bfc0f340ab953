// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

use displaydoc::Display;
use thiserror::Error;

use crate::PeerId;

/// network error
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum NetworkError {
    /// network err: {0}
    GeneralNetworkError(String),
    /// no active connection to peer `{0}`
    NotConnected(PeerId),
    /// delivery failed for {0} of {1} peers
    PartialDelivery(usize, usize),
    /// topic error: {0}
    TopicError(String),
    /// send error: {0}
    SendError(String),
}
