// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt::{self, Debug, Display, Write};

pub use log::Level;

/// Logger receives leveled messages with structured fields.
///
/// It is used for observability only. Implementations must not panic:
/// a failing logger can never change the outcome of a request.
pub trait Logger: Debug + Send + Sync + 'static {
    /// Record one message.
    fn log(&self, level: Level, message: &str, fields: &[(&str, &dyn Display)]);

    /// Record a debug message.
    fn debug(&self, message: &str, fields: &[(&str, &dyn Display)]) {
        self.log(Level::Debug, message, fields)
    }

    /// Record an info message.
    fn info(&self, message: &str, fields: &[(&str, &dyn Display)]) {
        self.log(Level::Info, message, fields)
    }

    /// Record a warning.
    fn warn(&self, message: &str, fields: &[(&str, &dyn Display)]) {
        self.log(Level::Warn, message, fields)
    }

    /// Record an error.
    fn error(&self, message: &str, fields: &[(&str, &dyn Display)]) {
        self.log(Level::Error, message, fields)
    }
}

/// LogFacade forwards everything to the `log` crate under the `flexfetch` target.
///
/// Fields are rendered after the message as `key=value` pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl Logger for LogFacade {
    fn log(&self, level: Level, message: &str, fields: &[(&str, &dyn Display)]) {
        if !log::log_enabled!(target: "flexfetch", level) {
            return;
        }

        log::log!(target: "flexfetch", level, "{}", Rendered { message, fields });
    }
}

/// NoopLogger drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _: Level, _: &str, _: &[(&str, &dyn Display)]) {}
}

struct Rendered<'a> {
    message: &'a str,
    fields: &'a [(&'a str, &'a dyn Display)],
}

impl Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)?;
        for (key, value) in self.fields {
            f.write_char(' ')?;
            f.write_str(key)?;
            f.write_char('=')?;
            Display::fmt(value, f)?;
        }
        Ok(())
    }
}
