//! Thread-local parser pool for reusing the tree-sitter Go parser.
//!
//! Building a module parses every test file it contains. Creating a fresh
//! `Parser` per file means re-loading the grammar each time, so each thread
//! keeps one lazily initialized parser and hands it out by closure.
//!
//! # Usage
//!
//! ```rust,ignore
//! use goview::ingest::pool::with_go_parser;
//!
//! let tree = with_go_parser(|parser| parser.parse(source, None))?;
//! ```

use std::cell::RefCell;

use crate::error::{ModelError, Result};

thread_local! {
    static GO_PARSER: RefCell<Option<tree_sitter::Parser>> = const { RefCell::new(None) };
}

/// Run `f` with this thread's Go parser, creating it on first use.
///
/// The parser is reset before each call so a previous cancelled parse never
/// leaks state into the next one.
pub fn with_go_parser<F, R>(f: F) -> Result<R>
where
    F: FnOnce(&mut tree_sitter::Parser) -> R,
{
    GO_PARSER.with(|parser_cell| {
        let mut parser_ref = parser_cell.borrow_mut();
        if parser_ref.is_none() {
            let mut parser = tree_sitter::Parser::new();
            parser
                .set_language(&tree_sitter_go::language())
                .map_err(|e| ModelError::parse("", format!("loading Go grammar: {}", e)))?;
            *parser_ref = Some(parser);
        }
        match parser_ref.as_mut() {
            Some(parser) => {
                parser.reset();
                Ok(f(parser))
            }
            None => Err(ModelError::parse("", "Go parser unavailable")),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_is_reused_across_calls() {
        let first = with_go_parser(|parser| parser.parse("package a", None).is_some()).unwrap();
        let second = with_go_parser(|parser| parser.parse("package b", None).is_some()).unwrap();
        assert!(first);
        assert!(second);
    }

    #[test]
    fn test_each_thread_gets_its_own_parser() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    let source = format!("package p{}\n\nfunc F{}() {{}}\n", i, i);
                    with_go_parser(|parser| {
                        parser
                            .parse(&source, None)
                            .map(|tree| tree.root_node().has_error())
                    })
                    .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(false));
        }
    }
}
