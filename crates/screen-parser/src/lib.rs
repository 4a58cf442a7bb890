//! Semantic screen parsing.
//!
//! Collapses a verbose tree-structured UI snapshot into a compact, labeled
//! element list suitable for a reasoning model, plus a lookup table that
//! resolves the listed ids back to actionable screen rectangles.
//!
//! ```
//! use screen_parser::ScreenParser;
//!
//! let markup = r#"<node class="android.widget.Button" text="OK"
//!                       clickable="true" bounds="[0,0][200,100]"/>"#;
//! let screen = ScreenParser::new().parse(markup, 1080, 2400);
//! assert_eq!(screen.element_count(), 1);
//! assert!(screen.display.contains("OK"));
//! ```

pub mod bounds;
pub mod markup;
pub mod models;
pub mod parser;

pub use bounds::Bounds;
pub use markup::{UiNode, UiTree};
pub use models::{ElementRecord, ParsedScreen, EMPTY_SCREEN_NOTICE};
pub use parser::{ParserPolicy, ScreenParser};
