//! Codec registry: builds each type's codec at most once and shares it.
//!
//! Lookups read an immutable snapshot of the published codecs through
//! `ArcSwap`, so the hot path takes no lock. A miss takes the registry's
//! build lock, checks the snapshot again, builds the codec and publishes a
//! new snapshot with it. The build lock is re-entrant: building a composite
//! resolves its member types on the same thread. The stack of types under
//! construction detects member types that lead back to a type being built.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::ReentrantMutex;
use rust_decimal::Decimal;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::codec::Codec;
use crate::config::SerializerConfig;
use crate::custom::CustomDeclaration;
use crate::descriptor::{AnyValue, Described, DynArray, TypeDescriptor, TypeRef};
use crate::dispatch;
use crate::error::{Result, TagbufError};
use crate::extract::MemberExtractor;
use crate::wire::type_discriminator;

/// Types under construction on the thread holding the build lock.
#[derive(Default)]
struct BuildState {
    in_progress: Vec<(TypeId, &'static str)>,
}

pub(crate) struct RegistryShared {
    config: SerializerConfig,
    extractor: Arc<dyn MemberExtractor>,
    published: ArcSwap<HashMap<TypeId, Arc<Codec>>>,
    dynamic_types: ArcSwap<HashMap<i64, TypeDescriptor>>,
    custom: ArcSwap<HashMap<TypeId, CustomDeclaration>>,
    build_lock: ReentrantMutex<RefCell<BuildState>>,
    builds: AtomicUsize,
}

impl RegistryShared {
    pub(crate) fn config(&self) -> &SerializerConfig {
        &self.config
    }

    pub(crate) fn extractor(&self) -> &dyn MemberExtractor {
        &*self.extractor
    }

    pub(crate) fn custom_declaration(&self, id: TypeId) -> Option<CustomDeclaration> {
        self.custom.load().get(&id).cloned()
    }

    pub(crate) fn dynamic_type(&self, discriminator: i64) -> Option<TypeDescriptor> {
        self.dynamic_types.load().get(&discriminator).cloned()
    }

    /// Returns the codec of `ty`, building it on first use.
    pub(crate) fn resolve(self: &Arc<Self>, ty: TypeRef) -> Result<Arc<Codec>> {
        if let Some(codec) = self.published.load().get(&ty.id()) {
            return Ok(Arc::clone(codec));
        }
        self.build(ty.id(), || ty.describe())
    }

    /// Returns the codec of an already described type.
    pub(crate) fn resolve_descriptor(
        self: &Arc<Self>,
        descriptor: &TypeDescriptor,
    ) -> Result<Arc<Codec>> {
        if let Some(codec) = self.published.load().get(&descriptor.id()) {
            return Ok(Arc::clone(codec));
        }
        self.build(descriptor.id(), || descriptor.clone())
    }

    fn build<F>(self: &Arc<Self>, id: TypeId, describe: F) -> Result<Arc<Codec>>
    where
        F: FnOnce() -> TypeDescriptor,
    {
        let guard = self.build_lock.lock();
        if let Some(codec) = self.published.load().get(&id) {
            return Ok(Arc::clone(codec));
        }

        let descriptor = describe();
        {
            let mut state = guard.borrow_mut();
            if let Some(pos) = state.in_progress.iter().position(|(entry, _)| *entry == id) {
                let mut chain: Vec<&str> = state.in_progress[pos..]
                    .iter()
                    .map(|(_, name)| *name)
                    .collect();
                chain.push(descriptor.name());
                return Err(TagbufError::RecursiveTypeNotSupported {
                    type_name: descriptor.name().to_string(),
                    cycle: chain.join(" -> "),
                });
            }
            state.in_progress.push((id, descriptor.name()));
        }

        let result = dispatch::build_codec(self, &descriptor);
        guard.borrow_mut().in_progress.pop();

        match result {
            Ok(codec) => {
                let codec = Arc::new(codec);
                let mut published = HashMap::clone(&self.published.load());
                published.insert(id, Arc::clone(&codec));
                self.published.store(Arc::new(published));
                self.builds.fetch_add(1, Ordering::Relaxed);
                self.register_dynamic(&descriptor);
                debug!(
                    type_name = descriptor.name(),
                    category = ?codec.category(),
                    "built codec"
                );
                Ok(codec)
            }
            Err(err) => {
                warn!(type_name = descriptor.name(), error = %err, "codec build failed");
                Err(err)
            }
        }
    }

    fn register_dynamic(&self, descriptor: &TypeDescriptor) {
        let _guard = self.build_lock.lock();
        let discriminator = type_discriminator(descriptor.name());
        let current = self.dynamic_types.load();
        match current.get(&discriminator) {
            Some(existing) if existing.id() == descriptor.id() => {}
            Some(existing) => {
                warn!(
                    type_name = descriptor.name(),
                    registered = existing.name(),
                    discriminator,
                    "dynamic type name already taken, keeping the first registration"
                );
            }
            None => {
                let mut types = HashMap::clone(&current);
                types.insert(discriminator, descriptor.clone());
                self.dynamic_types.store(Arc::new(types));
                trace!(type_name = descriptor.name(), discriminator, "registered dynamic type");
            }
        }
    }

    fn declare_custom(&self, id: TypeId, declaration: CustomDeclaration) {
        let _guard = self.build_lock.lock();
        let mut custom = HashMap::clone(&self.custom.load());
        custom.insert(id, declaration);
        self.custom.store(Arc::new(custom));
    }
}

/// A registry of built codecs, scoped to one serializer.
///
/// Cloning is cheap; clones share the same codecs.
#[derive(Clone)]
pub struct CodecRegistry {
    shared: Arc<RegistryShared>,
}

impl CodecRegistry {
    /// Creates a registry using the extractor selected by `config`.
    pub fn new(config: SerializerConfig) -> Self {
        let extractor: Arc<dyn MemberExtractor> = Arc::from(config.extractor().extractor());
        Self::with_extractor(config, extractor)
    }

    /// Creates a registry with an explicit member extractor.
    pub fn with_extractor(config: SerializerConfig, extractor: Arc<dyn MemberExtractor>) -> Self {
        let shared = Arc::new(RegistryShared {
            config,
            extractor,
            published: ArcSwap::from_pointee(HashMap::new()),
            dynamic_types: ArcSwap::from_pointee(HashMap::new()),
            custom: ArcSwap::from_pointee(HashMap::new()),
            build_lock: ReentrantMutex::new(RefCell::new(BuildState::default())),
            builds: AtomicUsize::new(0),
        });
        let registry = Self { shared };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&self) {
        self.register::<bool>();
        self.register::<i8>();
        self.register::<u8>();
        self.register::<i16>();
        self.register::<u16>();
        self.register::<i32>();
        self.register::<u32>();
        self.register::<i64>();
        self.register::<u64>();
        self.register::<f32>();
        self.register::<f64>();
        self.register::<String>();
        self.register::<Uuid>();
        self.register::<DateTime<Utc>>();
        self.register::<Decimal>();
        self.register::<AnyValue>();
        self.register::<DynArray>();
    }

    /// Returns the registry configuration.
    pub fn config(&self) -> &SerializerConfig {
        self.shared.config()
    }

    /// Returns the codec of `T`, building it on first use.
    pub fn codec<T: Described>(&self) -> Result<Arc<Codec>> {
        self.shared.resolve(TypeRef::of::<T>())
    }

    /// Returns the codec of the referenced type, building it on first use.
    pub fn resolve(&self, ty: TypeRef) -> Result<Arc<Codec>> {
        self.shared.resolve(ty)
    }

    /// Makes `T` resolvable from the discriminator of a dynamic value.
    pub fn register<T: Described>(&self) {
        self.shared.register_dynamic(&T::describe());
    }

    /// Declares custom serialization for `T`.
    ///
    /// The declaration takes precedence over one carried by `T`'s descriptor.
    /// Codecs already built are kept, so declare before first use.
    pub fn declare_custom<T: Described>(&self, declaration: CustomDeclaration) {
        if self.is_published::<T>() {
            warn!(
                type_name = std::any::type_name::<T>(),
                "custom declaration for a type whose codec is already built"
            );
        }
        self.shared.declare_custom(TypeId::of::<T>(), declaration);
    }

    /// Returns true if the codec of `T` has been built.
    pub fn is_published<T: Described>(&self) -> bool {
        self.shared.published.load().contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of published codecs.
    pub fn len(&self) -> usize {
        self.shared.published.load().len()
    }

    /// Returns true if no codec has been built yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how many codecs this registry has built.
    pub fn build_count(&self) -> usize {
        self.shared.builds.load(Ordering::Relaxed)
    }

    /// Returns true if `name` is registered as a dynamic type.
    pub fn is_registered(&self, name: &str) -> bool {
        self.shared
            .dynamic_types
            .load()
            .contains_key(&type_discriminator(name))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new(SerializerConfig::default())
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("config", &self.shared.config)
            .field("published", &self.len())
            .finish()
    }
}
