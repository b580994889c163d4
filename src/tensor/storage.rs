use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use xt_backend::{Backend, Element, RawArray, Value};

use crate::dispatch::{dispatch, DeviceKernel};
use crate::tensor::{Device, ElementType, Tensor};
use crate::Result;

/// Layout of a backend array, readable while the array itself is borrowed.
#[derive(Clone, Debug)]
pub(crate) struct StorageLayout {
    pub(crate) sizes: Vec<i64>,
    pub(crate) strides: Vec<i64>,
    pub(crate) offset: i64,
    pub(crate) numel: usize,
    pub(crate) is_contiguous: bool,
}
impl StorageLayout {
    fn of<T: Element, A: RawArray<T>>(array: &A) -> Self {
        Self {
            sizes: array.sizes().to_vec(),
            strides: array.strides().to_vec(),
            offset: array.storage_offset(),
            numel: array.numel(),
            is_contiguous: array.is_contiguous(),
        }
    }
}

struct Shared<C: ?Sized> {
    layout: RefCell<StorageLayout>,
    cell: C,
}

/// Type-erased, reference-counted backend array.
///
/// Holds a `RefCell<B::Array<T>>` for the `(B, T)` pair matching the tags of the tensors sharing it, next to a copy
/// of its layout. The copy is refreshed whenever a [`RawArrayMut`] guard is dropped.
#[derive(Clone)]
pub(crate) struct Storage(Rc<Shared<dyn Any>>);
impl Storage {
    pub(crate) fn new<B: Backend, T: Element>(array: B::Array<T>) -> Self {
        let layout = RefCell::new(StorageLayout::of::<T, _>(&array));
        let shared: Rc<Shared<dyn Any>> = Rc::new(Shared {
            layout,
            cell: RefCell::new(array),
        });
        Self(shared)
    }

    pub(crate) fn cell<B: Backend, T: Element>(&self) -> Option<&RefCell<B::Array<T>>> {
        self.0.cell.downcast_ref()
    }

    pub(crate) fn layout(&self) -> Ref<'_, StorageLayout> {
        self.0.layout.borrow()
    }

    /// Wrap a mutable borrow of the array of this storage so that it refreshes the layout when dropped.
    pub(crate) fn guard<'a, B: Backend, T: Element>(
        &'a self,
        array: RefMut<'a, B::Array<T>>,
    ) -> RawArrayMut<'a, B, T> {
        RawArrayMut {
            array,
            layout: &self.0.layout,
        }
    }

    pub(crate) fn use_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub(crate) fn ptr_eq(&self, other: &Storage) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A mutable borrow of the backend array of a tensor, obtained with [`Tensor::raw_mut`].
///
/// Changes to the layout of the array, e.g. through [`RawArray::resize`], become visible to the layout queries of
/// every handle sharing the storage once the guard is dropped.
pub struct RawArrayMut<'a, B: Backend, T: Element> {
    array: RefMut<'a, B::Array<T>>,
    layout: &'a RefCell<StorageLayout>,
}
impl<B: Backend, T: Element> Deref for RawArrayMut<'_, B, T> {
    type Target = B::Array<T>;

    fn deref(&self) -> &Self::Target {
        &self.array
    }
}
impl<B: Backend, T: Element> DerefMut for RawArrayMut<'_, B, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.array
    }
}
impl<B: Backend, T: Element> Drop for RawArrayMut<'_, B, T> {
    fn drop(&mut self) {
        let layout = StorageLayout::of::<T, _>(&*self.array);
        // layout borrows never outlive a single query
        if let Ok(mut current) = self.layout.try_borrow_mut() {
            *current = layout;
        }
    }
}

/// Allocates a fresh array, optionally giving it a layout.
pub(super) struct Allocate<'a> {
    pub(super) layout: Option<(&'a [i64], &'a [i64])>,
}
impl DeviceKernel<(ElementType, Device)> for Allocate<'_> {
    type Output = Storage;

    fn run<B: Backend, T: Element>(self, _: (ElementType, Device)) -> Result<Storage> {
        let mut array = <B::Array<T>>::default();
        if let Some((sizes, strides)) = self.layout {
            array.resize(sizes, strides)?;
        }
        Ok(Storage::new::<B, T>(array))
    }
}

/// Allocates a one-element array holding a value.
pub(super) struct AllocateScalar(pub(super) Value);
impl DeviceKernel<(ElementType, Device)> for AllocateScalar {
    type Output = Storage;

    fn run<B: Backend, T: Element>(self, _: (ElementType, Device)) -> Result<Storage> {
        let array = <B::Array<T> as RawArray<T>>::scalar(self.0.cast::<T>());
        Ok(Storage::new::<B, T>(array))
    }
}

/// Reads the single element of a scalar, converted to `T`.
pub(super) struct GetValue<T>(pub(super) PhantomData<T>);
impl<T: Element> DeviceKernel<&Tensor> for GetValue<T> {
    type Output = T;

    fn run<B: Backend, S: Element>(self, tensor: &Tensor) -> Result<T> {
        let array = tensor.raw::<B, S>()?;
        let value = array.get1d(0)?;
        Ok(value.into_value().cast::<T>())
    }
}

/// Reads every element in logical order, converted to `T`.
pub(super) struct Values<T>(pub(super) PhantomData<T>);
impl<T: Element> DeviceKernel<Tensor> for Values<T> {
    type Output = Vec<T>;

    fn run<B: Backend, S: Element>(self, tensor: Tensor) -> Result<Vec<T>> {
        let array = tensor.raw::<B, S>()?;
        let values = array
            .read_logical()
            .into_iter()
            .map(|v| v.into_value().cast::<T>())
            .collect();
        Ok(values)
    }
}

pub(super) struct DataPtr<T>(pub(super) PhantomData<T>);
impl<T: Element> DeviceKernel<&Tensor> for DataPtr<T> {
    type Output = *const T;

    fn run<B: Backend, S: Element>(self, tensor: &Tensor) -> Result<*const T> {
        let array = tensor.raw::<B, T>()?;
        Ok(array.data_ptr())
    }
}

pub(super) struct DataMutPtr<T>(pub(super) PhantomData<T>);
impl<T: Element> DeviceKernel<&mut Tensor> for DataMutPtr<T> {
    type Output = *mut T;

    fn run<B: Backend, S: Element>(self, tensor: &mut Tensor) -> Result<*mut T> {
        let mut array = tensor.raw_mut::<B, T>()?;
        let ptr = array.data_mut_ptr();
        Ok(ptr)
    }
}

/// Copies the elements of `src` into the destination tensor, dispatching a second time on the source tags.
pub(super) struct CopyInto<'s> {
    pub(super) src: &'s Tensor,
}
impl DeviceKernel<&mut Tensor> for CopyInto<'_> {
    type Output = ();

    fn run<B: Backend, T: Element>(self, dst: &mut Tensor) -> Result<()> {
        let mut array = dst.raw_mut::<B, T>()?;
        dispatch(
            CopyFrom {
                dst: &mut *array,
                element: PhantomData::<T>,
            },
            self.src,
        )
    }
}

struct CopyFrom<'d, A, D> {
    dst: &'d mut A,
    element: PhantomData<D>,
}
impl<A: RawArray<D>, D: Element> DeviceKernel<&Tensor> for CopyFrom<'_, A, D> {
    type Output = ();

    fn run<B: Backend, S: Element>(self, src: &Tensor) -> Result<()> {
        let array = src.raw::<B, S>()?;
        xt_backend::copy::<D, S, _, _>(self.dst, &*array)?;
        Ok(())
    }
}

/// Renders the elements of a tensor for formatting.
pub(super) struct Render;
impl DeviceKernel<&Tensor> for Render {
    type Output = String;

    fn run<B: Backend, T: Element>(self, tensor: &Tensor) -> Result<String> {
        let values = tensor.raw::<B, T>()?.read_logical();
        cfg_if::cfg_if! {
            if #[cfg(feature = "ndarray")] {
                let shape = tensor
                    .sizes()
                    .iter()
                    .map(|&size| size as usize)
                    .collect::<Vec<_>>();
                let rendered = match ndarray::ArrayD::from_shape_vec(shape, values) {
                    Ok(array) => format!("{array}"),
                    Err(_) => String::from("[]"),
                };
                Ok(rendered)
            } else {
                Ok(format!("{values:?}"))
            }
        }
    }
}
