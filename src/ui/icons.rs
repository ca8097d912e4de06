//! Shared UI icons and emojis.
//!
//! Emoji constants used across the terminal components, each with a plain
//! fallback for terminals that cannot render them.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Item markers
pub static DONE_BOX: Emoji<'_, '_> = Emoji("☑ ", "[x]");
pub static OPEN_BOX: Emoji<'_, '_> = Emoji("☐ ", "[ ]");

// List states
pub static CLIPBOARD: Emoji<'_, '_> = Emoji("📋 ", "");
pub static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "?");
pub static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "!");
pub static PLUS: Emoji<'_, '_> = Emoji("➕ ", "+");
pub static TRASH: Emoji<'_, '_> = Emoji("🗑️  ", "-");
pub static PROGRESS: Emoji<'_, '_> = Emoji("📊 ", "");
