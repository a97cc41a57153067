//! Deprecated `typing` generics and their PEP 585 replacements.

use std::collections::HashMap;

lazy_static::lazy_static! {
    static ref PEP585: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("typing.Tuple", "tuple");
        map.insert("typing.List", "list");
        map.insert("typing.Dict", "dict");
        map.insert("typing.Set", "set");
        map.insert("typing.FrozenSet", "frozenset");
        map.insert("typing.Type", "type");
        map.insert("typing.Deque", "collections.deque");
        map.insert("typing.DefaultDict", "collections.defaultdict");
        map.insert("typing.OrderedDict", "collections.OrderedDict");
        map.insert("typing.Counter", "collections.Counter");
        map.insert("typing.ChainMap", "collections.ChainMap");
        map.insert("typing.Awaitable", "collections.abc.Awaitable");
        map.insert("typing.Coroutine", "collections.abc.Coroutine");
        map.insert("typing.AsyncIterable", "collections.abc.AsyncIterable");
        map.insert("typing.AsyncIterator", "collections.abc.AsyncIterator");
        map.insert("typing.AsyncGenerator", "collections.abc.AsyncGenerator");
        map.insert("typing.Iterable", "collections.abc.Iterable");
        map.insert("typing.Iterator", "collections.abc.Iterator");
        map.insert("typing.Generator", "collections.abc.Generator");
        map.insert("typing.Reversible", "collections.abc.Reversible");
        map.insert("typing.Container", "collections.abc.Container");
        map.insert("typing.Collection", "collections.abc.Collection");
        map.insert("typing.Callable", "collections.abc.Callable");
        map.insert("typing.AbstractSet", "collections.abc.Set");
        map.insert("typing.MutableSet", "collections.abc.MutableSet");
        map.insert("typing.Mapping", "collections.abc.Mapping");
        map.insert("typing.MutableMapping", "collections.abc.MutableMapping");
        map.insert("typing.Sequence", "collections.abc.Sequence");
        map.insert("typing.MutableSequence", "collections.abc.MutableSequence");
        map.insert("typing.ByteString", "collections.abc.ByteString");
        map.insert("typing.MappingView", "collections.abc.MappingView");
        map.insert("typing.KeysView", "collections.abc.KeysView");
        map.insert("typing.ItemsView", "collections.abc.ItemsView");
        map.insert("typing.ValuesView", "collections.abc.ValuesView");
        map.insert("typing.ContextManager", "contextlib.AbstractContextManager");
        map.insert("typing.AsyncContextManager", "contextlib.AbstractAsyncContextManager");
        map.insert("typing.Pattern", "re.Pattern");
        map.insert("typing.re.Pattern", "re.Pattern");
        map.insert("typing.Match", "re.Match");
        map.insert("typing.re.Match", "re.Match");
        map
    };
}

/// The replacement of a deprecated `typing` generic, by dotted name.
pub fn replacement(name: &str) -> Option<&'static str> {
    PEP585.get(name).copied()
}

/// Whether `name` is a builtin or standard constructor whose call result
/// is documented by the constructor name itself.
pub fn is_constructor(name: &str) -> bool {
    matches!(
        name,
        "bool" | "int" | "float" | "complex" | "str" | "bytes"
    ) || PEP585.contains_key(name)
        || PEP585.values().any(|replacement| *replacement == name)
}
