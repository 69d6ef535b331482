use std::{
    any::{TypeId, type_name},
    borrow::Cow,
    collections::HashMap,
    fmt::{self, Debug, Display},
    ops::Deref,
    panic::{Location, RefUnwindSafe},
};

use tracing::trace;

use crate::{
    context::{Context, SuiteEnv},
    result::ResultTree,
    traverse::traverse,
};

/// All registered suites, in registration order.
///
/// Filled before a run starts and only read while suites execute.
#[derive(Debug, Default)]
pub struct SuiteRegistry {
    suites: Vec<Suite>,
    by_name: HashMap<Cow<'static, str>, usize>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `thunk` to the bucket `key` of the suite `name`.
    ///
    /// The suite and the bucket are created on first use.
    /// `type_names` is only recorded when the bucket has none yet, so
    /// registering more thunks under the same key does not repeat it.
    #[track_caller]
    pub fn register<N, T>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        key: InstantiationKey,
        type_names: N,
        thunk: impl Into<SuiteFnHandle>,
    ) where
        N: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.register_at(name.into(), key, type_names, thunk.into(), Location::caller());
    }

    fn register_at<N, T>(
        &mut self,
        name: Cow<'static, str>,
        key: InstantiationKey,
        type_names: N,
        thunk: SuiteFnHandle,
        location: &'static Location<'static>,
    ) -> &mut Suite
    where
        N: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let index = match self.by_name.get(&name) {
            Some(index) => *index,
            None => {
                let index = self.suites.len();
                self.by_name.insert(name.clone(), index);
                self.suites.push(Suite {
                    meta: SuiteMeta {
                        name,
                        categories: Vec::new(),
                        location,
                        index,
                    },
                    buckets: Vec::new(),
                });
                index
            }
        };

        let suite = &mut self.suites[index];
        let bucket = match suite.buckets.iter().position(|bucket| bucket.key == key) {
            Some(position) => &mut suite.buckets[position],
            None => {
                suite.buckets.push(Bucket {
                    key,
                    type_names: Vec::new(),
                    thunks: Vec::new(),
                });
                let last = suite.buckets.len() - 1;
                &mut suite.buckets[last]
            }
        };

        if bucket.type_names.is_empty() {
            bucket.type_names = type_names.into_iter().map(Into::into).collect();
        }
        bucket.thunks.push(thunk);
        trace!(
            suite = %suite.meta.name,
            key = ?bucket.key,
            thunks = bucket.thunks.len(),
            "registered suite thunk"
        );
        suite
    }

    /// Start defining a suite body named `name`.
    #[track_caller]
    pub fn suite(&mut self, name: impl Into<Cow<'static, str>>) -> SuiteDef<'_> {
        SuiteDef {
            registry: self,
            name: name.into(),
            categories: Vec::new(),
            key: InstantiationKey::none(),
            type_names: Vec::new(),
            params: Vec::new(),
            location: Location::caller(),
        }
    }

    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }

    pub fn get(&self, name: &str) -> Option<&Suite> {
        self.by_name.get(name).map(|index| &self.suites[*index])
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub struct Suite {
    pub meta: SuiteMeta,
    pub buckets: Vec<Bucket>,
}

impl Suite {
    pub fn thunk_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.thunks.len()).sum()
    }
}

impl Deref for Suite {
    type Target = SuiteMeta;

    fn deref(&self) -> &Self::Target {
        &self.meta
    }
}

#[derive(Debug, Clone)]
pub struct SuiteMeta {
    pub name: Cow<'static, str>,
    pub categories: Vec<Cow<'static, str>>,
    /// Where the suite was first registered.
    pub location: &'static Location<'static>,
    /// Position in registration order.
    pub index: usize,
}

/// The thunks sharing one suite name and one instantiation.
#[derive(Debug)]
pub struct Bucket {
    pub key: InstantiationKey,
    pub type_names: Vec<String>,
    thunks: Vec<SuiteFnHandle>,
}

impl Bucket {
    pub fn thunks(&self) -> &[SuiteFnHandle] {
        &self.thunks
    }
}

/// Opaque identity of one instantiation of a suite.
///
/// Only compared for equality, the readable form lives in the bucket's type
/// names.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct InstantiationKey(KeyRepr);

#[derive(Clone, PartialEq, Eq, Hash, Default)]
enum KeyRepr {
    #[default]
    Unit,
    Type(TypeId, &'static str),
    Named(Cow<'static, str>),
}

impl InstantiationKey {
    /// The key of a suite that is not instantiated over anything.
    pub const fn none() -> Self {
        Self(KeyRepr::Unit)
    }

    /// The key of an instantiation over the type `T`.
    ///
    /// Use a tuple to key over several types at once.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(KeyRepr::Type(TypeId::of::<T>(), type_name::<T>()))
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self(KeyRepr::Named(name.into()))
    }
}

impl Debug for InstantiationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            KeyRepr::Unit => f.write_str("InstantiationKey(())"),
            KeyRepr::Type(_, name) => write!(f, "InstantiationKey({name})"),
            KeyRepr::Named(name) => write!(f, "InstantiationKey({name:?})"),
        }
    }
}

#[non_exhaustive]
pub enum SuiteFnHandle {
    Ptr(fn(&SuiteEnv) -> ResultTree),
    Owned(Box<dyn SuiteFn + Send + Sync + RefUnwindSafe>),
    Static(&'static (dyn SuiteFn + Send + Sync + RefUnwindSafe)),
}

impl Debug for SuiteFnHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ptr(ptr) => f.debug_tuple("Ptr").field(ptr).finish(),
            Self::Owned(_) => write!(f, "Owned(...)"),
            Self::Static(_) => write!(f, "Static(...)"),
        }
    }
}

impl SuiteFnHandle {
    pub const fn from_fn(f: fn(&SuiteEnv) -> ResultTree) -> Self {
        Self::Ptr(f)
    }

    pub fn from_boxed<F>(f: F) -> Self
    where
        F: Fn(&SuiteEnv) -> ResultTree + Send + Sync + RefUnwindSafe + 'static,
    {
        Self::Owned(Box::new(f))
    }

    pub const fn from_static_obj(f: &'static (dyn SuiteFn + Send + Sync + RefUnwindSafe)) -> Self {
        Self::Static(f)
    }

    /// Run one full traversal and return its result tree.
    pub fn call(&self, env: &SuiteEnv) -> ResultTree {
        match self {
            Self::Ptr(f) => f(env),
            Self::Owned(f) => f.call_suite(env),
            Self::Static(f) => f.call_suite(env),
        }
    }
}

impl<F> From<F> for SuiteFnHandle
where
    F: Fn(&SuiteEnv) -> ResultTree + Send + Sync + RefUnwindSafe + 'static,
{
    fn from(f: F) -> Self {
        Self::from_boxed(f)
    }
}

pub trait SuiteFn {
    fn call_suite(&self, env: &SuiteEnv) -> ResultTree;
}

impl<F> SuiteFn for F
where
    F: Fn(&SuiteEnv) -> ResultTree,
{
    fn call_suite(&self, env: &SuiteEnv) -> ResultTree {
        (self)(env)
    }
}

/// Builder returned by [`SuiteRegistry::suite`].
///
/// ```ignore
/// registry
///     .suite("stack")
///     .categories(["collections"])
///     .typed::<u32>(["u32"])
///     .run(|ctx| {
///         let mut stack = Vec::<u32>::new();
///         ctx.section("push", |ctx| {
///             stack.push(1);
///             ctx.expect(stack.len()).is_eq(1);
///         });
///     });
/// ```
#[must_use = "a suite is only registered by calling `run`"]
pub struct SuiteDef<'r> {
    registry: &'r mut SuiteRegistry,
    name: Cow<'static, str>,
    categories: Vec<Cow<'static, str>>,
    key: InstantiationKey,
    type_names: Vec<String>,
    params: Vec<String>,
    location: &'static Location<'static>,
}

impl SuiteDef<'_> {
    pub fn categories<I>(mut self, categories: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.categories.extend(categories.into_iter().map(Into::into));
        self
    }

    pub fn instantiation<I>(self, key: InstantiationKey, type_names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            key,
            type_names: type_names.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Key this body by the type `T`.
    pub fn typed<T: ?Sized + 'static>(self, type_names: impl IntoIterator<Item = &'static str>) -> Self {
        self.instantiation(InstantiationKey::of::<T>(), type_names)
    }

    /// Display strings of the values this body runs with.
    pub fn params<I>(self, params: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        Self {
            params: params.into_iter().map(|param| param.to_string()).collect(),
            ..self
        }
    }

    /// Register `body` as a thunk running the full traversal.
    pub fn run<F>(self, body: F)
    where
        F: Fn(&mut Context) + Send + Sync + RefUnwindSafe + 'static,
    {
        let SuiteDef {
            registry,
            name,
            categories,
            key,
            type_names,
            params,
            location,
        } = self;

        let suite_name = name.clone();
        let thunk = move |env: &SuiteEnv| traverse(&suite_name, location, params.clone(), env, &body);
        let suite = registry.register_at(name, key, type_names, SuiteFnHandle::from_boxed(thunk), location);
        for category in categories {
            if !suite.meta.categories.contains(&category) {
                suite.meta.categories.push(category);
            }
        }
    }
}
