//! Boundary between the override core and whatever the host server exposes.
//!
//! The core never names a concrete host type. Hosts describe what their
//! objects can do (declared getters, one-argument methods, construction entry
//! points, nested enum types) and the core probes those declarations by name.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bevy_reflect::{Reflect, TypeRegistry};

pub mod ecs;
pub mod text;

/// One-argument entry point declared by a host object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub name: Cow<'static, str>,
    /// Concrete type of the single argument.
    pub accepts: TypeId,
}

impl MethodSig {
    pub fn new(name: impl Into<Cow<'static, str>>, accepts: TypeId) -> Self {
        Self {
            name: name.into(),
            accepts,
        }
    }

    pub fn of<T: Any>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, TypeId::of::<T>())
    }
}

/// A user entity or one of its nested holders, as seen through the host API.
///
/// `invoke` hands the argument back when the host refuses the call so the
/// caller can try the next candidate.
pub trait HostObject {
    /// Zero-argument accessors in declaration order.
    fn getters(&self) -> Vec<Cow<'static, str>>;

    /// Value returned by a zero-argument accessor.
    fn get(&self, getter: &str) -> Option<&dyn Reflect>;

    /// Object returned by a zero-argument accessor, when it exposes methods of
    /// its own.
    fn nested(&self, getter: &str) -> Option<&dyn HostObject>;

    fn nested_mut(&mut self, getter: &str) -> Option<&mut dyn HostObject>;

    /// One-argument methods in declaration order.
    fn methods(&self) -> Vec<MethodSig>;

    fn invoke(&mut self, method: &str, arg: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>;
}

/// Parameter type of a record construction entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Decoded text, possibly absent.
    Text,
    Integer,
    Flag,
    /// Anything the decoded snapshot cannot supply.
    Other(TypeId),
}

type BuildFn = dyn Fn(&[Option<String>]) -> Option<Box<dyn Reflect>> + Send + Sync;

/// Construction entry point declared by a record type.
#[derive(Clone)]
pub struct Constructor {
    pub name: Cow<'static, str>,
    pub params: Vec<ParamKind>,
    build: Arc<BuildFn>,
}

impl Constructor {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, params: Vec<ParamKind>, build: F) -> Self
    where
        F: Fn(&[Option<String>]) -> Option<Box<dyn Reflect>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            build: Arc::new(build),
        }
    }

    /// Constructor taking `arity` text parameters.
    pub fn text<F>(name: impl Into<Cow<'static, str>>, arity: usize, build: F) -> Self
    where
        F: Fn(&[Option<String>]) -> Option<Box<dyn Reflect>> + Send + Sync + 'static,
    {
        Self::new(name, vec![ParamKind::Text; arity], build)
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn takes_only_text(&self) -> bool {
        self.params.iter().all(|p| *p == ParamKind::Text)
    }

    /// Invoke positionally. Callers must have checked arity and types.
    pub fn call(&self, args: &[Option<String>]) -> Option<Box<dyn Reflect>> {
        (self.build)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Type data listing a record type's construction entry points in
/// declaration order.
#[derive(Debug, Clone, Default)]
pub struct RecordConstructors {
    entries: Vec<Constructor>,
}

impl RecordConstructors {
    pub fn new(entries: Vec<Constructor>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constructor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attach construction entry points to `T` in `registry`, registering `T`
/// first if needed.
pub fn register_constructors<T>(registry: &mut TypeRegistry, constructors: RecordConstructors)
where
    T: Reflect + bevy_reflect::GetTypeRegistration,
{
    registry.register::<T>();
    if let Some(registration) = registry.get_mut(TypeId::of::<T>()) {
        registration.insert(constructors);
    }
}

/// Parameter type of a message method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageParam {
    Text,
    Message,
    /// A constant of the nested enum type with this name.
    Enum(Cow<'static, str>),
}

/// Method declared on an outbound message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMethod {
    pub name: Cow<'static, str>,
    pub params: Vec<MessageParam>,
}

impl MessageMethod {
    pub fn new(name: impl Into<Cow<'static, str>>, params: Vec<MessageParam>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Enumerated type nested in a message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionKind {
    pub name: Cow<'static, str>,
    pub constants: Vec<Cow<'static, str>>,
}

/// Argument passed to a message method.
#[derive(Debug)]
pub enum MessageArg<M> {
    Text(String),
    Message(M),
    Constant {
        kind: Cow<'static, str>,
        name: Cow<'static, str>,
    },
}

/// Outbound chat message object.
pub trait ChatMessage: Sized {
    fn raw(text: &str) -> Self;

    /// Append a child fragment. Part of every host version.
    #[must_use]
    fn insert(self, child: Self) -> Self;

    /// Enumerated types nested in the message type, in declaration order.
    fn action_kinds(&self) -> Vec<ActionKind>;

    /// Public methods in declaration order.
    fn methods(&self) -> Vec<MessageMethod>;

    /// Call `method` with positional `args`. Returns `false` when the host
    /// rejects the call.
    fn call(&mut self, method: &str, args: Vec<MessageArg<Self>>) -> bool;
}
