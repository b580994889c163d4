use rand::Rng;

use xt::dispatch::{dispatch, dispatch_with, DeviceKernel, Kernel};
use xt::{Backend, Context, Device, Element, ElementType, Error, RawArray, Result, Tensor, Value};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Sum;
impl DeviceKernel<&Tensor> for Sum {
    type Output = f64;
    fn run<B: Backend, T: Element>(self, tensor: &Tensor) -> Result<f64> {
        let array = tensor.raw::<B, T>()?;
        let sum = array
            .read_logical()
            .into_iter()
            .map(|v| v.into_value().cast::<f64>())
            .sum();
        Ok(sum)
    }
}
impl DeviceKernel<&mut Tensor> for Sum {
    type Output = f64;
    fn run<B: Backend, T: Element>(self, tensor: &mut Tensor) -> Result<f64> {
        let array = tensor.raw_mut::<B, T>()?;
        let sum = array
            .read_logical()
            .into_iter()
            .map(|v| v.into_value().cast::<f64>())
            .sum();
        Ok(sum)
    }
}
impl DeviceKernel<Tensor> for Sum {
    type Output = f64;
    fn run<B: Backend, T: Element>(self, tensor: Tensor) -> Result<f64> {
        Ok(tensor.into_values::<f64>()?.into_iter().sum())
    }
}

/// Writes `0, 1, 2, ...` in logical order.
struct Iota;
impl DeviceKernel<&mut Tensor> for Iota {
    type Output = ();
    fn run<B: Backend, T: Element>(self, tensor: &mut Tensor) -> Result<()> {
        let mut array = tensor.raw_mut::<B, T>()?;
        array.write_logical((0i64..).map(|i| Value::from(i).cast::<T>()));
        Ok(())
    }
}

/// Fills a tensor with uniform samples in `[0, 100)` drawn from the context generator.
struct Uniform;
impl DeviceKernel<(&mut Context, &mut Tensor)> for Uniform {
    type Output = ();
    fn run<B: Backend, T: Element>(self, (ctx, tensor): (&mut Context, &mut Tensor)) -> Result<()> {
        let samples = (0..tensor.numel())
            .map(|_| Value::from(ctx.generator().gen_range(0.0..100.0f64)).cast::<T>())
            .collect::<Vec<_>>();
        tensor.raw_mut::<B, T>()?.write_logical(samples);
        Ok(())
    }
}

/// A kernel implemented for the host only.
struct HostName;
impl Kernel<&Tensor> for HostName {
    type Output = &'static str;
    fn cpu<T: Element>(self, _: &Tensor) -> Result<&'static str> {
        Ok(T::NAME)
    }
}

#[test]
fn sum_in_every_binding_mode() {
    init_logger();
    for ty in ElementType::ALL {
        let mut tensor = Tensor::with_shape(&[2, 3], ty, Device::Cpu).unwrap();
        dispatch(Iota, &mut tensor).unwrap();

        assert_eq!(dispatch(Sum, &tensor).unwrap(), 15.0, "{ty}");
        assert_eq!(dispatch(Sum, &mut tensor).unwrap(), 15.0, "{ty}");
        let alias = tensor.clone();
        assert_eq!(dispatch(Sum, alias).unwrap(), 15.0, "{ty}");
        assert_eq!(tensor.use_count(), 1);
    }
}

#[test]
fn sum_of_strided_tensor() {
    let mut tensor =
        Tensor::with_shape_and_strides(&[3, 2], &[1, 4], ElementType::Int16, Device::Cpu).unwrap();
    dispatch(Iota, &mut tensor).unwrap();
    assert_eq!(tensor.to_values::<i16>().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(dispatch(Sum, &tensor).unwrap(), 15.0);
}

#[test]
fn kernel_sees_runtime_type() {
    for ty in ElementType::ALL {
        let tensor = Tensor::typed(ty, Device::Cpu).unwrap();
        assert_eq!(dispatch(HostName, &tensor).unwrap(), ty.name());
    }
}

#[test]
fn empty_tensor_dispatch() {
    let tensor = Tensor::new();
    assert_eq!(
        dispatch(Sum, &tensor),
        Err(Error::UnsupportedDevice(Device::Unknown))
    );
    assert_eq!(
        dispatch(Sum, Tensor::new()),
        Err(Error::UnsupportedDevice(Device::Unknown))
    );
}

#[test]
fn dispatch_on_explicit_tags() {
    let tensor = Tensor::with_shape(&[4], ElementType::Float, Device::Cpu).unwrap();
    assert_eq!(
        dispatch_with(ElementType::Float, Device::Cpu, HostName, &tensor),
        Ok("float")
    );
    // the kernel view must match the handle tags
    assert_eq!(
        dispatch_with(ElementType::Double, Device::Cpu, Sum, &tensor),
        Err(Error::TypeMismatch {
            expected: ElementType::Float,
            actual: ElementType::Double
        })
    );
}

#[test]
fn context_generator_in_kernel() {
    let mut a = Tensor::with_shape(&[8], ElementType::Double, Device::Cpu).unwrap();
    let mut b = Tensor::with_shape(&[8], ElementType::Double, Device::Cpu).unwrap();
    let mut ctx_a = Context::with_seed(42);
    let mut ctx_b = Context::with_seed(42);
    dispatch(Uniform, (&mut ctx_a, &mut a)).unwrap();
    dispatch(Uniform, (&mut ctx_b, &mut b)).unwrap();

    let xs = a.to_values::<f64>().unwrap();
    assert_eq!(xs, b.to_values::<f64>().unwrap());
    assert!(xs.iter().all(|&x| (0.0..100.0).contains(&x)));

    let mut ints = Tensor::with_shape(&[16], ElementType::UInt8, Device::Cpu).unwrap();
    dispatch(Uniform, (&mut ctx_a, &mut ints)).unwrap();
    assert!(ints.to_values::<u8>().unwrap().iter().all(|&x| x < 100));
}

#[test]
fn host_only_kernel_on_gpu() {
    assert_eq!(
        dispatch_with(
            ElementType::Int32,
            Device::Gpu,
            HostName,
            &Tensor::new()
        ),
        Err(Error::UnsupportedDevice(Device::Gpu))
    );
}

#[cfg(feature = "gpu")]
#[test]
fn device_kernels_on_gpu() {
    let mut tensor = Tensor::with_shape(&[2, 2], ElementType::Int64, Device::Gpu).unwrap();
    dispatch(Iota, &mut tensor).unwrap();
    assert_eq!(dispatch(Sum, &tensor).unwrap(), 6.0);
    assert_eq!(
        dispatch(HostName, &tensor),
        Err(Error::UnsupportedDevice(Device::Gpu))
    );
}
