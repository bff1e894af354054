//! Tagged-union registries: a string type key selects the loader for one
//! variant of a sum type.
//!
//! Built in two phases, like any other registry in the workspace:
//! registration on a [`RegistryBuilder`], then [`RegistryBuilder::build`]
//! freezes it into an immutable [`GenericLoaderRegistry`] that is itself a
//! [`Loadable`] and is safe to share between threads.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use serde_json::{Map, Value};

use crate::buf::{ByteReader, ByteWriter};
use crate::collection::ListLoadable;
use crate::error::{LoadError, LoadErrorKind, key_path};
use crate::loadable::Loadable;
use crate::record::{RecordFields, RecordLoadable};

/// Conventional JSON key holding the variant's type key.
pub const TYPE_KEY: &str = "type";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate type key '{key}' in registry '{registry}'")]
    DuplicateKey { registry: String, key: String },
}

// ---------------------------------------------------------------------------
// Variant loaders
// ---------------------------------------------------------------------------

/// Payload codec for one variant. Receives the owning registry so that
/// variants can nest values of the same union.
trait VariantLoader<T>: Send + Sync {
    /// Parse the variant from the object that also holds the type key.
    fn convert(
        &self,
        object: &Map<String, Value>,
        path: &str,
        registry: &GenericLoaderRegistry<T>,
    ) -> Result<T, LoadError>;

    /// Serialize the variant's fields, or `None` if `value` is some other
    /// variant.
    fn serialize(
        &self,
        value: &T,
        registry: &GenericLoaderRegistry<T>,
    ) -> Option<Result<Map<String, Value>, LoadError>>;

    fn decode(
        &self,
        reader: &mut ByteReader<'_>,
        registry: &GenericLoaderRegistry<T>,
    ) -> Result<T, LoadError>;

    /// Encode the variant's fields, or `None` if `value` is some other
    /// variant.
    fn encode(
        &self,
        writer: &mut ByteWriter,
        value: &T,
        registry: &GenericLoaderRegistry<T>,
    ) -> Option<Result<(), LoadError>>;
}

/// A variant whose payload is a record.
struct RecordVariant<T, P, F, B> {
    record: RecordLoadable<P, F, B>,
    wrap: fn(P) -> T,
    unwrap: fn(&T) -> Option<&P>,
}

impl<T, P, F, B> VariantLoader<T> for RecordVariant<T, P, F, B>
where
    F: RecordFields<P> + Send + Sync,
    B: Fn(F::Values) -> Result<P, String> + Send + Sync,
{
    fn convert(
        &self,
        object: &Map<String, Value>,
        path: &str,
        _registry: &GenericLoaderRegistry<T>,
    ) -> Result<T, LoadError> {
        self.record.convert_object(object, path).map(self.wrap)
    }

    fn serialize(
        &self,
        value: &T,
        _registry: &GenericLoaderRegistry<T>,
    ) -> Option<Result<Map<String, Value>, LoadError>> {
        let payload = (self.unwrap)(value)?;
        Some(self.record.serialize(payload).and_then(|node| match node {
            Value::Object(object) => Ok(object),
            other => Err(LoadError::wrong_type("", "object", &other)),
        }))
    }

    fn decode(
        &self,
        reader: &mut ByteReader<'_>,
        _registry: &GenericLoaderRegistry<T>,
    ) -> Result<T, LoadError> {
        self.record.decode(reader).map(self.wrap)
    }

    fn encode(
        &self,
        writer: &mut ByteWriter,
        value: &T,
        _registry: &GenericLoaderRegistry<T>,
    ) -> Option<Result<(), LoadError>> {
        let payload = (self.unwrap)(value)?;
        Some(self.record.encode(writer, payload))
    }
}

/// A stateless marker variant. Always yields a clone of the same value.
struct SingletonVariant<T> {
    value: T,
    matches: fn(&T) -> bool,
}

impl<T: Clone + Send + Sync> VariantLoader<T> for SingletonVariant<T> {
    fn convert(
        &self,
        _object: &Map<String, Value>,
        _path: &str,
        _registry: &GenericLoaderRegistry<T>,
    ) -> Result<T, LoadError> {
        Ok(self.value.clone())
    }

    fn serialize(
        &self,
        value: &T,
        _registry: &GenericLoaderRegistry<T>,
    ) -> Option<Result<Map<String, Value>, LoadError>> {
        (self.matches)(value).then(|| Ok(Map::new()))
    }

    fn decode(
        &self,
        _reader: &mut ByteReader<'_>,
        _registry: &GenericLoaderRegistry<T>,
    ) -> Result<T, LoadError> {
        Ok(self.value.clone())
    }

    fn encode(
        &self,
        _writer: &mut ByteWriter,
        value: &T,
        _registry: &GenericLoaderRegistry<T>,
    ) -> Option<Result<(), LoadError>> {
        (self.matches)(value).then_some(Ok(()))
    }
}

/// A variant holding a list of values of the same union, e.g. `and`/`or`.
struct NestedListVariant<T> {
    key: &'static str,
    min_size: usize,
    wrap: fn(Vec<T>) -> T,
    unwrap: fn(&T) -> Option<&Vec<T>>,
}

impl<T: 'static> VariantLoader<T> for NestedListVariant<T> {
    fn convert(
        &self,
        object: &Map<String, Value>,
        path: &str,
        registry: &GenericLoaderRegistry<T>,
    ) -> Result<T, LoadError> {
        let field_path = key_path(path, self.key);
        let node = object
            .get(self.key)
            .ok_or_else(|| LoadError::missing(field_path.clone()))?;
        ListLoadable::new(registry, self.min_size)
            .convert(node, &field_path)
            .map(self.wrap)
    }

    fn serialize(
        &self,
        value: &T,
        registry: &GenericLoaderRegistry<T>,
    ) -> Option<Result<Map<String, Value>, LoadError>> {
        let children = (self.unwrap)(value)?;
        Some(
            ListLoadable::new(registry, self.min_size)
                .serialize(children)
                .map(|node| {
                    let mut object = Map::new();
                    object.insert(self.key.to_string(), node);
                    object
                }),
        )
    }

    fn decode(
        &self,
        reader: &mut ByteReader<'_>,
        registry: &GenericLoaderRegistry<T>,
    ) -> Result<T, LoadError> {
        ListLoadable::new(registry, self.min_size)
            .decode(reader)
            .map(self.wrap)
    }

    fn encode(
        &self,
        writer: &mut ByteWriter,
        value: &T,
        registry: &GenericLoaderRegistry<T>,
    ) -> Option<Result<(), LoadError>> {
        let children = (self.unwrap)(value)?;
        Some(ListLoadable::new(registry, self.min_size).encode(writer, children))
    }
}

/// A variant wrapping exactly one value of the same union, e.g. `inverted`.
struct NestedSingleVariant<T> {
    key: &'static str,
    wrap: fn(T) -> T,
    unwrap: fn(&T) -> Option<&T>,
}

impl<T: 'static> VariantLoader<T> for NestedSingleVariant<T> {
    fn convert(
        &self,
        object: &Map<String, Value>,
        path: &str,
        registry: &GenericLoaderRegistry<T>,
    ) -> Result<T, LoadError> {
        let field_path = key_path(path, self.key);
        let node = object
            .get(self.key)
            .ok_or_else(|| LoadError::missing(field_path.clone()))?;
        registry.convert(node, &field_path).map(self.wrap)
    }

    fn serialize(
        &self,
        value: &T,
        registry: &GenericLoaderRegistry<T>,
    ) -> Option<Result<Map<String, Value>, LoadError>> {
        let inner = (self.unwrap)(value)?;
        Some(registry.serialize(inner).map(|node| {
            let mut object = Map::new();
            object.insert(self.key.to_string(), node);
            object
        }))
    }

    fn decode(
        &self,
        reader: &mut ByteReader<'_>,
        registry: &GenericLoaderRegistry<T>,
    ) -> Result<T, LoadError> {
        registry.decode(reader).map(self.wrap)
    }

    fn encode(
        &self,
        writer: &mut ByteWriter,
        value: &T,
        registry: &GenericLoaderRegistry<T>,
    ) -> Option<Result<(), LoadError>> {
        let inner = (self.unwrap)(value)?;
        Some(registry.encode(writer, inner))
    }
}

// ---------------------------------------------------------------------------
// RegistryBuilder
// ---------------------------------------------------------------------------

struct Entry<T> {
    key: &'static str,
    loader: Box<dyn VariantLoader<T>>,
}

/// Registration phase of a [`GenericLoaderRegistry`].
pub struct RegistryBuilder<T> {
    name: String,
    type_key: &'static str,
    entries: Vec<Entry<T>>,
    index: HashMap<&'static str, usize>,
}

impl<T: 'static> RegistryBuilder<T> {
    /// `name` identifies the registry in errors and logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_key: TYPE_KEY,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Use a JSON key other than [`TYPE_KEY`] for the discriminant.
    pub fn with_type_key(mut self, type_key: &'static str) -> Self {
        self.type_key = type_key;
        self
    }

    fn insert(
        &mut self,
        key: &'static str,
        loader: Box<dyn VariantLoader<T>>,
    ) -> Result<(), RegistryError> {
        if self.index.contains_key(key) {
            return Err(RegistryError::DuplicateKey {
                registry: self.name.clone(),
                key: key.to_string(),
            });
        }
        tracing::debug!(registry = %self.name, key, "registered variant loader");
        self.index.insert(key, self.entries.len());
        self.entries.push(Entry { key, loader });
        Ok(())
    }

    /// Register a variant whose payload `P` is described by a record.
    pub fn register<P, F, B>(
        &mut self,
        key: &'static str,
        record: RecordLoadable<P, F, B>,
        wrap: fn(P) -> T,
        unwrap: fn(&T) -> Option<&P>,
    ) -> Result<(), RegistryError>
    where
        P: 'static,
        F: RecordFields<P> + Send + Sync + 'static,
        B: Fn(F::Values) -> Result<P, String> + Send + Sync + 'static,
    {
        self.insert(
            key,
            Box::new(RecordVariant {
                record,
                wrap,
                unwrap,
            }),
        )
    }

    /// Register a stateless variant. `matches` recognises it when
    /// serializing.
    pub fn register_singleton(
        &mut self,
        key: &'static str,
        value: T,
        matches: fn(&T) -> bool,
    ) -> Result<(), RegistryError>
    where
        T: Clone + Send + Sync,
    {
        self.insert(key, Box::new(SingletonVariant { value, matches }))
    }

    /// Register a variant holding a list of at least `min_size` values of
    /// this union under `field`.
    pub fn register_nested_list(
        &mut self,
        key: &'static str,
        field: &'static str,
        min_size: usize,
        wrap: fn(Vec<T>) -> T,
        unwrap: fn(&T) -> Option<&Vec<T>>,
    ) -> Result<(), RegistryError> {
        self.insert(
            key,
            Box::new(NestedListVariant {
                key: field,
                min_size,
                wrap,
                unwrap,
            }),
        )
    }

    /// Register a variant wrapping one value of this union under `field`.
    pub fn register_nested(
        &mut self,
        key: &'static str,
        field: &'static str,
        wrap: fn(T) -> T,
        unwrap: fn(&T) -> Option<&T>,
    ) -> Result<(), RegistryError> {
        self.insert(
            key,
            Box::new(NestedSingleVariant {
                key: field,
                wrap,
                unwrap,
            }),
        )
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Freeze the registry.
    pub fn build(self) -> GenericLoaderRegistry<T> {
        tracing::debug!(
            registry = %self.name,
            variants = self.entries.len(),
            "registry built"
        );
        GenericLoaderRegistry {
            name: self.name,
            type_key: self.type_key,
            entries: self.entries,
            index: self.index,
        }
    }
}

// ---------------------------------------------------------------------------
// GenericLoaderRegistry
// ---------------------------------------------------------------------------

/// Immutable type-key dispatch table for the sum type `T`.
pub struct GenericLoaderRegistry<T> {
    name: String,
    type_key: &'static str,
    entries: Vec<Entry<T>>,
    index: HashMap<&'static str, usize>,
}

impl<T: 'static> GenericLoaderRegistry<T> {
    pub fn builder(name: impl Into<String>) -> RegistryBuilder<T> {
        RegistryBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.key)
    }

    fn lookup(&self, key: &str) -> Option<&Entry<T>> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Type key of the variant that `value` belongs to.
    pub fn key_of(&self, value: &T) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|entry| entry.loader.serialize(value, self).is_some())
            .map(|entry| entry.key)
    }

    fn unregistered(&self) -> LoadError {
        LoadError::custom(
            "",
            format!("value has no registered variant in '{}'", self.name),
        )
    }
}

impl<T: 'static> Loadable for GenericLoaderRegistry<T> {
    type Value = T;

    /// Accepts `{"type": key, ...fields}` or, for variants without required
    /// fields, the bare string `key`.
    fn convert(&self, node: &Value, path: &str) -> Result<T, LoadError> {
        let empty = Map::new();
        let (key, object) = match node {
            Value::String(key) => (key.as_str(), &empty),
            Value::Object(object) => {
                let key_node_path = key_path(path, self.type_key);
                let key = object
                    .get(self.type_key)
                    .ok_or_else(|| LoadError::missing(key_node_path.clone()))?;
                let key = key
                    .as_str()
                    .ok_or_else(|| LoadError::wrong_type(key_node_path, "string", key))?;
                (key, object)
            }
            other => return Err(LoadError::wrong_type(path, "object", other)),
        };
        let entry = self.lookup(key).ok_or_else(|| {
            LoadError::new(
                key_path(path, self.type_key),
                LoadErrorKind::UnknownTypeKey(key.to_string()),
            )
        })?;
        entry.loader.convert(object, path, self)
    }

    fn serialize(&self, value: &T) -> Result<Value, LoadError> {
        for entry in &self.entries {
            if let Some(fields) = entry.loader.serialize(value, self) {
                let mut object = fields?;
                object.insert(self.type_key.to_string(), Value::String(entry.key.to_string()));
                return Ok(Value::Object(object));
            }
        }
        Err(self.unregistered())
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<T, LoadError> {
        let key = reader.read_string()?;
        let entry = self.lookup(&key).ok_or_else(|| {
            LoadError::decode(format!("unknown type key '{key}' in '{}'", self.name))
        })?;
        entry.loader.decode(reader, self)
    }

    fn encode(&self, writer: &mut ByteWriter, value: &T) -> Result<(), LoadError> {
        for entry in &self.entries {
            // Write into a scratch buffer first so a non-matching variant
            // leaves no bytes behind.
            let mut scratch = ByteWriter::new();
            if let Some(result) = entry.loader.encode(&mut scratch, value, self) {
                result?;
                writer.write_string(entry.key)?;
                for byte in scratch.as_bytes() {
                    writer.write_u8(*byte);
                }
                return Ok(());
            }
        }
        Err(self.unregistered())
    }
}

// ---------------------------------------------------------------------------
// Self-referencing registries
// ---------------------------------------------------------------------------

impl<T: 'static> GenericLoaderRegistry<T> {
    /// Build a registry whose record variants hold values of the union
    /// itself. `register` receives a [`RegistryHandle`] to use as a field
    /// loadable; it resolves once the registry is built.
    pub fn build_cyclic<F>(name: impl Into<String>, register: F) -> Result<Arc<Self>, RegistryError>
    where
        F: FnOnce(&mut RegistryBuilder<T>, RegistryHandle<T>) -> Result<(), RegistryError>,
    {
        let mut outcome = Ok(());
        let registry = Arc::new_cyclic(|this| {
            let mut builder = RegistryBuilder::new(name);
            outcome = register(&mut builder, RegistryHandle(this.clone()));
            builder.build()
        });
        outcome.map(|()| registry)
    }
}

/// Weak loadable reference to a registry, for fields of its own variants.
pub struct RegistryHandle<T>(Weak<GenericLoaderRegistry<T>>);

impl<T> RegistryHandle<T> {
    fn upgrade(&self) -> Result<Arc<GenericLoaderRegistry<T>>, LoadError> {
        self.0
            .upgrade()
            .ok_or_else(|| LoadError::custom("", "registry is no longer alive"))
    }
}

impl<T> Clone for RegistryHandle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: 'static> Loadable for RegistryHandle<T> {
    type Value = T;

    fn convert(&self, node: &Value, path: &str) -> Result<T, LoadError> {
        self.upgrade()?.convert(node, path)
    }

    fn serialize(&self, value: &T) -> Result<Value, LoadError> {
        self.upgrade()?.serialize(value)
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<T, LoadError> {
        self.upgrade()?.decode(reader)
    }

    fn encode(&self, writer: &mut ByteWriter, value: &T) -> Result<(), LoadError> {
        self.upgrade()?.encode(writer, value)
    }
}

impl<T> std::fmt::Debug for GenericLoaderRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericLoaderRegistry")
            .field("name", &self.name)
            .field("type_key", &self.type_key)
            .field("keys", &self.entries.iter().map(|e| e.key).collect::<Vec<_>>())
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
