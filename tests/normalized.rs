mod support;

use burn::tensor::Tensor;
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;

use support::{DEVICE, SumNet, TestBackend, assert_close, floats, tensor};
use vfuncs::{
    BaseVfunc, MlpValueNetConfig, NormalizedDeterministicVfunc, ObservationSpace, RunningMeanStd,
    StdValidation, ValueNetwork, VfuncError,
};

#[test]
fn rescales_raw_output_with_mean_and_std() {
    let net = MlpValueNetConfig::new(3).init::<TestBackend>(&DEVICE);
    let mut vfunc =
        NormalizedDeterministicVfunc::new(ObservationSpace::boxed([3]), net).expect("feed-forward");
    let obs = tensor(vec![0.5, -1.0, 2.0, 1.5, 0.0, -0.5], [2, 3]);
    let raw: Vec<f32> = floats(vfunc.net().forward(obs.clone()).flatten::<1>(0, 1));

    vfunc
        .set_mean(Tensor::from_floats([5.0], &DEVICE))
        .expect("mean");
    vfunc.set_std(Tensor::from_floats([2.0], &DEVICE)).expect("std");
    let values = floats(vfunc.forward(obs));

    let expected: Vec<f32> = raw.iter().map(|value| value * 2.0 + 5.0).collect();
    assert_close(&values, &expected);
}

#[test]
fn output_is_flat_for_multi_axis_observations() {
    let net = SumNet::<TestBackend>::new(4, &DEVICE);
    let space = ObservationSpace::boxed([2, 2]);
    let mut vfunc = NormalizedDeterministicVfunc::new(space, net).expect("feed-forward");
    vfunc.set_mean_scalar(-1.0).expect("mean");
    vfunc.set_std_scalar(3.0).expect("std");
    let values = vfunc.forward(tensor(vec![1.0; 8], [2, 2, 2]));
    assert_eq!(values.dims(), [2]);
    assert_eq!(floats(values), vec![11.0, 11.0]);
}

#[test]
fn sync_stats_injects_running_statistics() {
    let net = SumNet::<TestBackend>::new(1, &DEVICE);
    let mut vfunc =
        NormalizedDeterministicVfunc::new(ObservationSpace::boxed([1]), net).expect("feed-forward");
    let mut returns = RunningMeanStd::new();
    returns.update_batch(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    vfunc.sync_stats(&returns).expect("valid statistics");

    assert_close(&floats(vfunc.mean().clone()), &[5.0]);
    assert_close(&floats(vfunc.std().clone()), &[2.0]);
    let values = floats(vfunc.forward(tensor(vec![0.0, 1.0], [2, 1])));
    assert_close(&values, &[5.0, 7.0]);
}

#[test]
fn rejected_std_leaves_buffers_untouched() {
    let net = SumNet::<TestBackend>::new(2, &DEVICE);
    let mut vfunc = NormalizedDeterministicVfunc::new(ObservationSpace::boxed([2]), net)
        .expect("feed-forward")
        .with_std_validation(StdValidation::Positive);
    let err = vfunc.set_std_scalar(-2.0).expect_err("negative std");
    assert!(matches!(err, VfuncError::InvalidStd(value) if value == -2.0));
    let values = floats(vfunc.forward(tensor(vec![1.0, 2.0], [1, 2])));
    assert_eq!(values, vec![3.0]);
}

#[test]
fn normalized_vfunc_is_single_device_and_feed_forward() {
    let net = SumNet::<TestBackend>::new(2, &DEVICE);
    let vfunc =
        NormalizedDeterministicVfunc::new(ObservationSpace::boxed([2]), net).expect("feed-forward");
    assert!(!vfunc.is_recurrent());
    assert!(!vfunc.data_parallel());
    assert_eq!(vfunc.ob_space(), &ObservationSpace::boxed([2]));
}

#[test]
fn gradients_flow_through_rescaling() {
    type TrainBackend = Autodiff<TestBackend>;
    let net = SumNet::<TrainBackend>::new(4, &DEVICE);
    let mut vfunc =
        NormalizedDeterministicVfunc::new(ObservationSpace::boxed([4]), net).expect("feed-forward");
    vfunc.set_std_scalar(2.0).expect("std");
    vfunc.set_mean_scalar(1.0).expect("mean");

    let obs = Tensor::<TrainBackend, 2>::ones([3, 4], &DEVICE);
    let loss = vfunc.forward(obs).sum();
    let grads = loss.backward();
    let weight_grad = vfunc
        .net()
        .head
        .weight
        .val()
        .grad(&grads)
        .expect("weight gradient");
    assert_eq!(weight_grad.dims(), [4, 1]);
    // d/dw of sum_i (2 * x_i . w + 1) with x_i = 1 over three rows
    let grad: Vec<f32> = weight_grad.into_data().to_vec::<f32>().expect("floats");
    assert_close(&grad, &[6.0; 4]);
}

#[test]
fn double_precision_backend_accepts_std_and_stats() {
    type DoubleBackend = NdArray<f64>;
    let net = SumNet::<DoubleBackend>::new(2, &DEVICE);
    let mut vfunc =
        NormalizedDeterministicVfunc::new(ObservationSpace::boxed([2]), net).expect("feed-forward");
    vfunc.set_std(Tensor::from_floats([2.0], &DEVICE)).expect("std");
    vfunc.set_std_scalar(2.0).expect("scalar std");
    vfunc.set_mean_scalar(1.0).expect("mean");

    let obs = Tensor::<DoubleBackend, 2>::ones([3, 2], &DEVICE);
    let values: Vec<f64> = vfunc.forward(obs).into_data().to_vec().expect("f64 values");
    assert_eq!(values, vec![5.0; 3]);

    let mut returns = RunningMeanStd::new();
    returns.update_batch(&[1.0, 3.0]);
    vfunc.sync_stats(&returns).expect("valid statistics");
    let std: Vec<f64> = vfunc.std().clone().into_data().to_vec().expect("f64 std");
    assert_eq!(std, vec![1.0]);
}

#[test]
fn empty_batch_yields_empty_values() {
    let net = SumNet::<TestBackend>::new(2, &DEVICE);
    let mut vfunc =
        NormalizedDeterministicVfunc::new(ObservationSpace::boxed([2]), net).expect("feed-forward");
    vfunc.set_std_scalar(2.0).expect("std");
    let obs = Tensor::<TestBackend, 2>::zeros([0, 2], &DEVICE);
    assert_eq!(vfunc.raw(obs.clone()).dims(), [0]);
    assert_eq!(vfunc.forward(obs).dims(), [0]);
}

#[test]
fn unchecked_std_stores_nan_and_positive_rejects_it() {
    let net = SumNet::<TestBackend>::new(1, &DEVICE);
    let mut vfunc =
        NormalizedDeterministicVfunc::new(ObservationSpace::boxed([1]), net).expect("feed-forward");
    vfunc.set_std_scalar(f32::NAN).expect("unchecked");
    assert!(floats(vfunc.std().clone())[0].is_nan());

    let mut vfunc = vfunc.with_std_validation(StdValidation::Positive);
    let err = vfunc.set_std_scalar(f32::NAN).expect_err("nan std");
    assert!(matches!(err, VfuncError::InvalidStd(value) if value.is_nan()));
}
