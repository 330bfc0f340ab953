// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>

#[macro_export]
macro_rules! hive_trace {
    ($evt:expr, $params:tt) => {
        tracing::trace!("hive_trace:{}:{}", $evt, serde_json::json!($params));
    };
}
