mod builder;
mod common;
mod matching;
