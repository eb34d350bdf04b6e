pub mod ast;
pub mod context;
pub mod dump;
pub mod encode;
pub mod error;
pub mod expression;
pub mod keyword;
pub mod lexer;
pub mod limits;
pub mod parser;
pub mod string_storage;
