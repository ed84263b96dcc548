//! Pre-interned attribute names.
//!
//! Attribute lookup happens on every executed node; interning the
//! vocabulary once per execution keeps the hot path free of string
//! hashing.

use quill_ir::{Name, StringInterner};

#[derive(Copy, Clone, Debug)]
pub struct AttrNames {
    pub name: Name,
    pub value: Name,
    pub operation: Name,
    pub key: Name,
    pub condition: Name,
    pub from: Name,
    pub to: Name,
    pub step: Name,
    pub index: Name,
    pub array: Name,
    pub item: Name,
    pub list: Name,
    pub delimiter: Name,
    pub object: Name,
    pub query: Name,
    pub memoize: Name,
    pub returns: Name,
    pub pure: Name,
    pub access: Name,
    pub function: Name,
    pub result: Name,
    pub ty: Name,
    pub required: Name,
    pub default: Name,
    pub min: Name,
    pub max: Name,
    pub pattern: Name,
    pub one_of: Name,
}

impl AttrNames {
    pub fn new(interner: &StringInterner) -> Self {
        AttrNames {
            name: interner.intern("name"),
            value: interner.intern("value"),
            operation: interner.intern("operation"),
            key: interner.intern("key"),
            condition: interner.intern("condition"),
            from: interner.intern("from"),
            to: interner.intern("to"),
            step: interner.intern("step"),
            index: interner.intern("index"),
            array: interner.intern("array"),
            item: interner.intern("item"),
            list: interner.intern("list"),
            delimiter: interner.intern("delimiter"),
            object: interner.intern("object"),
            query: interner.intern("query"),
            memoize: interner.intern("memoize"),
            returns: interner.intern("returns"),
            pure: interner.intern("pure"),
            access: interner.intern("access"),
            function: interner.intern("function"),
            result: interner.intern("result"),
            ty: interner.intern("type"),
            required: interner.intern("required"),
            default: interner.intern("default"),
            min: interner.intern("min"),
            max: interner.intern("max"),
            pattern: interner.intern("pattern"),
            one_of: interner.intern("oneOf"),
        }
    }
}
