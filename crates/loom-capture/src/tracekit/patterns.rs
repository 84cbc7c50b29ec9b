// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-line grammars for the raw trace formats we understand.

use regex::Regex;
use std::sync::LazyLock;

/// V8: `    at fn (url:line:col)`, `    at url:line:col`, `    at fn (native)`.
pub(crate) static CHROME: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)^\s*at (?:(.*?) ?\()?((?:file|https?|blob|chrome-extension|native|eval|webpack|<anonymous>|[a-z]:|/).*?)(?::(\d+))?(?::(\d+))?\)?\s*$",
	)
	.unwrap()
});

/// Location nested inside a V8 `eval at fn (url:line:col)` wrapper.
pub(crate) static CHROME_EVAL: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\((\S*)(?::(\d+))(?::(\d+))\)").unwrap());

/// SpiderMonkey / JavaScriptCore: `fn(args)@url:line:col`.
pub(crate) static GECKO: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)^\s*(.*?)(?:\((.*?)\))?(?:^|@)((?:file|https?|blob|chrome|webpack|resource|moz-extension).*?:/.*?|\[native code\]|[^@]*bundle)(?::(\d+))?(?::(\d+))?\s*$",
	)
	.unwrap()
});

/// `url line N > eval` wrapper in SpiderMonkey locations.
pub(crate) static GECKO_EVAL: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)(\S+) line (\d+)(?: > eval line \d+)* > eval").unwrap());

/// Chakra / WinJS: `   at fn (ms-appx://...:line:col)`.
pub(crate) static WINJS: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)^\s*at (?:((?:\[object object\])?.+) )?\(?((?:file|ms-appx|https?|webpack|blob):.*?):(\d+)(?::(\d+))?\)?\s*$",
	)
	.unwrap()
});

/// Messages where the reported column is misleading.
pub(crate) static IS_UNDEFINED: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(.*) is undefined$").unwrap());

/// Presto 10 `stacktrace` frame line.
pub(crate) static OPERA10: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i) line (\d+).*script (?:in )?(\S+)(?:: in function (\S+))?$").unwrap()
});

/// Presto 11 `stacktrace` frame line.
pub(crate) static OPERA11: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i) line (\d+), column (\d+)\s*(?:in (?:<anonymous function: ([^>]+)>|([^\)]+))\((.*)\))? in (.*):\s*$",
	)
	.unwrap()
});

/// Multi-line message: `Line N of linked script URL`.
pub(crate) static LINKED_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)^\s*Line (\d+) of linked script ((?:file|https?|blob)\S+)(?:: in function (\S+))?\s*$",
	)
	.unwrap()
});

/// Multi-line message: `Line N of inline#K script in URL`.
pub(crate) static INLINE_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)^\s*Line (\d+) of inline#(\d+) script in ((?:file|https?|blob)\S+)(?:: in function (\S+))?\s*$",
	)
	.unwrap()
});

/// Multi-line message: `Line N of function script`.
pub(crate) static FUNCTION_SCRIPT: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)^\s*Line (\d+) of function script\s*$").unwrap());

/// Function name in decompiled source.
pub(crate) static FUNCTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)function\s+([_$a-zA-Z\x{A0}-\x{D7FF}\x{E000}-\x{FFFF}][_$a-zA-Z0-9\x{A0}-\x{D7FF}\x{E000}-\x{FFFF}]*)?\s*\(",
	)
	.unwrap()
});

/// `'name' is ...` style messages; their column is unreliable.
pub(crate) static QUOTED_REFERENCE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r" '([^']+)' ").unwrap());

/// `[Uncaught [exception: ]][<Kind>Error: ]message`.
pub(crate) static ERROR_TYPES: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"^(?:[Uu]ncaught (?:exception: )?)?(?:((?:Eval|Internal|Range|Reference|Syntax|Type|URI)?Error): )?(.*)$",
	)
	.unwrap()
});
