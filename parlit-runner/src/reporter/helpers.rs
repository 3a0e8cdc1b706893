// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::result::ResultCode;
use owo_colors::Style;

/// The delimiter used around failure output and summary sections.
pub(super) const BANNER: &str = "********************";

#[derive(Clone, Debug, Default)]
pub(super) struct Styles {
    pub(super) count: Style,
    pub(super) pass: Style,
    pub(super) fail: Style,
    pub(super) skip: Style,
    pub(super) banner: Style,
}

impl Styles {
    pub(super) fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.banner = Style::new().magenta();
    }

    pub(super) fn for_code(&self, code: ResultCode) -> Style {
        match code {
            ResultCode::Pass | ResultCode::Xfail => self.pass,
            ResultCode::Fail | ResultCode::Xpass | ResultCode::Unresolved => self.fail,
            ResultCode::Unsupported | ResultCode::Excluded => self.skip,
        }
    }
}
