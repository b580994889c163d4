#![allow(dead_code)]

use xt_backend::Element;

use crate::{Device, ElementType, Tensor};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A host tensor of the given sizes holding `values` in row-major order.
pub(crate) fn filled<T: Element>(sizes: &[i64], values: &[T]) -> Tensor {
    let mut tensor = Tensor::with_shape(sizes, ElementType::of::<T>(), Device::Cpu).unwrap();
    tensor.data_mut::<T>().unwrap().copy_from_slice(values);
    tensor
}

#[test]
fn failed_resize_is_logged() {
    init_logger();
    let mut tensor = filled(&[2], &[1i32, 2]);
    assert!(tensor.resize(&[0]).is_err());
    assert_eq!(tensor.to_values::<i32>().unwrap(), vec![1, 2]);
}
