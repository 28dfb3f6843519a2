//! Members of composite types and the builder that declares them.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{downcast, unbox, CompositeShape, Described, ErasedValue, Shape, TypeRef};
use crate::error::{Result, TagbufError};

/// Where a member's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOrigin {
    /// A storage slot of the struct, read by reference.
    Field,
    /// A value produced and consumed by accessor functions.
    Accessor,
}

/// A member value obtained from its owner.
pub enum MemberRef<'a> {
    /// A reference into the owner.
    Borrowed(&'a dyn Any),
    /// A value computed by a getter.
    Owned(ErasedValue),
}

impl MemberRef<'_> {
    /// Returns the value as `&dyn Any`.
    pub fn as_any(&self) -> &dyn Any {
        match self {
            MemberRef::Borrowed(value) => *value,
            MemberRef::Owned(value) => &**value,
        }
    }
}

/// Reads a member from a type-erased owner.
pub trait MemberGetter: Send + Sync {
    /// Returns the member value of `owner`.
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<MemberRef<'a>>;
}

/// Assigns a member of a type-erased owner.
pub trait MemberSetter: Send + Sync {
    /// Stores `value` into the member of `owner`.
    fn set(&self, owner: &mut dyn Any, value: ErasedValue) -> Result<()>;
}

struct FieldGetter<T, F> {
    access: fn(&T) -> &F,
}

impl<T: Any, F: Any> MemberGetter for FieldGetter<T, F> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<MemberRef<'a>> {
        let owner = downcast::<T>(owner)?;
        Ok(MemberRef::Borrowed((self.access)(owner)))
    }
}

struct PropertyGetter<T, F> {
    get: fn(&T) -> F,
}

impl<T: Any, F: Any + Send> MemberGetter for PropertyGetter<T, F> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<MemberRef<'a>> {
        let owner = downcast::<T>(owner)?;
        Ok(MemberRef::Owned(Box::new((self.get)(owner))))
    }
}

struct FnSetter<T, F> {
    set: fn(&mut T, F),
}

impl<T: Any, F: Any> MemberSetter for FnSetter<T, F> {
    fn set(&self, owner: &mut dyn Any, value: ErasedValue) -> Result<()> {
        let owner = owner.downcast_mut::<T>().ok_or_else(|| {
            TagbufError::decode(format!("member owner is not a {}", std::any::type_name::<T>()))
        })?;
        (self.set)(owner, unbox::<F>(value)?);
        Ok(())
    }
}

/// One candidate member of a composite type.
#[derive(Clone)]
pub struct MemberDescriptor {
    name: &'static str,
    ty: TypeRef,
    origin: MemberOrigin,
    getter: Option<Arc<dyn MemberGetter>>,
    setter: Option<Arc<dyn MemberSetter>>,
}

impl MemberDescriptor {
    /// Returns the member name; its hash is the member tag on the wire.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the declared member type.
    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    /// Returns where the member's value lives.
    pub fn origin(&self) -> MemberOrigin {
        self.origin
    }

    /// Returns true if the member can be read.
    pub fn has_getter(&self) -> bool {
        self.getter.is_some()
    }

    /// Returns true if the member can be assigned.
    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }

    /// Reads the member from `owner`.
    pub fn get<'a>(&self, owner: &'a dyn Any) -> Result<MemberRef<'a>> {
        match &self.getter {
            Some(getter) => getter.get(owner),
            None => Err(TagbufError::Encode(format!(
                "member '{}' has no getter",
                self.name
            ))),
        }
    }

    /// Assigns the member of `owner`.
    pub fn set(&self, owner: &mut dyn Any, value: ErasedValue) -> Result<()> {
        match &self.setter {
            Some(setter) => setter.set(owner, value),
            None => Err(TagbufError::decode(format!(
                "member '{}' has no setter",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// Declares the members of a composite type `T`.
///
/// # Example
///
/// ```
/// use tagbuf_core::{CompositeBuilder, Described, TypeDescriptor};
///
/// #[derive(Default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Described for Point {
///     fn describe() -> TypeDescriptor {
///         let shape = CompositeBuilder::<Self>::new()
///             .field("x", |p| &p.x, |p, v| p.x = v)
///             .field("y", |p| &p.y, |p, v| p.y = v)
///             .build();
///         TypeDescriptor::of::<Self>("Point", shape)
///     }
/// }
/// ```
pub struct CompositeBuilder<T> {
    members: Vec<MemberDescriptor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Described> CompositeBuilder<T> {
    /// Creates a builder with no members.
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Adds a struct field that can be read and assigned.
    pub fn field<F: Described>(
        self,
        name: &'static str,
        get: fn(&T) -> &F,
        set: fn(&mut T, F),
    ) -> Self {
        self.push::<F>(
            name,
            MemberOrigin::Field,
            Some(Arc::new(FieldGetter { access: get })),
            Some(Arc::new(FnSetter { set })),
        )
    }

    /// Adds a struct field that can only be read.
    pub fn readonly_field<F: Described>(self, name: &'static str, get: fn(&T) -> &F) -> Self {
        self.push::<F>(
            name,
            MemberOrigin::Field,
            Some(Arc::new(FieldGetter { access: get })),
            None,
        )
    }

    /// Adds an accessor pair.
    pub fn property<F: Described>(
        self,
        name: &'static str,
        get: fn(&T) -> F,
        set: fn(&mut T, F),
    ) -> Self {
        self.push::<F>(
            name,
            MemberOrigin::Accessor,
            Some(Arc::new(PropertyGetter { get })),
            Some(Arc::new(FnSetter { set })),
        )
    }

    /// Adds a computed member with a getter and no setter.
    pub fn getter_only<F: Described>(self, name: &'static str, get: fn(&T) -> F) -> Self {
        self.push::<F>(
            name,
            MemberOrigin::Accessor,
            Some(Arc::new(PropertyGetter { get })),
            None,
        )
    }

    /// Adds a member with a setter and no getter.
    pub fn setter_only<F: Described>(self, name: &'static str, set: fn(&mut T, F)) -> Self {
        self.push::<F>(
            name,
            MemberOrigin::Accessor,
            None,
            Some(Arc::new(FnSetter { set })),
        )
    }

    /// Finishes the declaration.
    pub fn build(self) -> Shape {
        Shape::Composite(CompositeShape {
            members: self.members,
        })
    }

    fn push<F: Described>(
        mut self,
        name: &'static str,
        origin: MemberOrigin,
        getter: Option<Arc<dyn MemberGetter>>,
        setter: Option<Arc<dyn MemberSetter>>,
    ) -> Self {
        self.members.push(MemberDescriptor {
            name,
            ty: TypeRef::of::<F>(),
            origin,
            getter,
            setter,
        });
        self
    }
}

impl<T: Described> Default for CompositeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
