//! Tests that check for consistency between `apply` and `derivatives`.

use ndarray::prelude::*;
use ndarray::IntoDimension;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use regeval::layers::{
    Activation, ActivationLayer, BiasLayer, InputLayer, LinearLayer, Sequence, Stack,
};
use regeval::*;

fn test_layer<L, D>(layer: L, input_shape: D, error_limit: f32)
where
    D: IntoDimension,
    L: Layer<D::Dim>,
{
    let input_shape = input_shape.into_dimension();
    let output_shape = layer.output_shape(input_shape.clone());

    let n = layer.num_params();
    let mut params = Array::random(n, Uniform::new(0.0, 1.0));
    let mut x = Array::random(input_shape.clone(), Uniform::new(0.0, 1.0));
    let mut tmp = Array2::zeros(layer.hidden_activations_shape(input_shape.clone()));
    let mut z = Array::zeros(output_shape.clone());
    layer.apply(params.view(), x.view(), tmp.view_mut(), z.view_mut());

    let dz = Array::random(z.raw_dim(), Uniform::new(-0.1, 0.1));
    let mut dp = Array::zeros(n);
    let dx = layer.derivatives(
        params.view(),
        x.view(),
        tmp.view(),
        dz.view(),
        dp.view_mut(),
    );

    let h = 0.0003;

    fn err(claimed: f32, measured: f32) -> f32 {
        let d = measured.abs().max(0.01);
        (claimed - measured).abs() / d
    }

    let mut z_minus = Array::zeros(output_shape.clone());
    let mut z_plus = Array::zeros(output_shape.clone());
    for i in 0..n {
        // check accuracy of derivative at parameter params[i]
        let saved = params[i];
        params[i] = saved - h;
        layer.apply(params.view(), x.view(), tmp.view_mut(), z_minus.view_mut());
        params[i] = saved + h;
        layer.apply(params.view(), x.view(), tmp.view_mut(), z_plus.view_mut());
        params[i] = saved;

        let claimed = dp[i];
        let measured = ((&z_plus - &z_minus) * (1.0 / (2.0 * h)) * &dz).sum();

        let error = err(claimed, measured);
        assert!(
            error <= error_limit,
            "{layer:?}: parameter {i} computed derivative = {claimed}, measured = {measured}, error = {error}, limit = {error_limit}"
        );
    }

    for i in ndarray::indices(input_shape) {
        // check accuracy of derivative at input x[i]
        let i = i.into_dimension();
        let saved = x[i.clone()];
        x[i.clone()] = saved - h;
        layer.apply(params.view(), x.view(), tmp.view_mut(), z_minus.view_mut());
        x[i.clone()] = saved + h;
        layer.apply(params.view(), x.view(), tmp.view_mut(), z_plus.view_mut());
        x[i.clone()] = saved;

        let claimed = dx[i.clone()];
        let measured = ((&z_plus - &z_minus) * (1.0 / (2.0 * h)) * &dz).sum();

        let error = err(claimed, measured);
        assert!(
            error <= error_limit,
            "{layer:?}: input element {i:?} computed derivative = {claimed}, measured = {measured}, error = {error}, limit = {error_limit}"
        );
    }
}

fn mlp(widths: &[usize], f: Activation) -> Stack {
    let mut stack = Stack::new();
    for pair in widths.windows(2) {
        stack.push(LinearLayer::new(pair[0], pair[1]));
        stack.push(BiasLayer::new(Ix2(1, pair[1])));
        stack.push(ActivationLayer::new(f));
    }
    stack
}

#[test]
fn test_layer_consistency() {
    test_layer(LinearLayer::new(1, 1), (1, 1), 0.01);
    test_layer(InputLayer::new().linear(1, 1), (1, 1), 0.01);
    test_layer(LinearLayer::new(5, 3), (1, 5), 0.01);
    test_layer(InputLayer::new().linear(5, 3), (1, 5), 0.01);
    test_layer(BiasLayer::new(Ix2(1, 4)), (3, 4), 0.01);

    test_layer(LinearLayer::new(1, 1).relu(), (2, 1), 0.01);
    test_layer(LinearLayer::new(10, 10).relu(), (2, 10), 0.01);
    test_layer(LinearLayer::new(4, 2).sigmoid(), (3, 4), 0.01);
    test_layer(LinearLayer::new(4, 2).tanh(), (3, 4), 0.01);
    test_layer(
        LinearLayer::new(3, 3).sigmoid().linear(3, 4).tanh(),
        (2, 3),
        0.01,
    );
    test_layer(
        InputLayer::new()
            .linear(3, 2)
            .activation(Activation::Linear),
        (2, 3),
        0.01,
    );

    test_layer(LinearLayer::new(1, 1).parallel(1), (1, 1), 0.01);
    test_layer(LinearLayer::new(1, 1).parallel(1), (2, 1), 0.01);
    test_layer(LinearLayer::new(1, 1).parallel(4), (4, 1), 0.01);
    test_layer(LinearLayer::new(1, 1).parallel(4), (5, 1), 0.01);
    test_layer(LinearLayer::new(3, 2).tanh().parallel(2), (5, 3), 0.01);
}

#[test]
fn test_stack_consistency() {
    test_layer(Stack::new().with(LinearLayer::new(2, 3)), (2, 2), 0.01);
    test_layer(mlp(&[3, 4], Activation::Tanh), (2, 3), 0.01);
    test_layer(mlp(&[3, 4, 2], Activation::Sigmoid), (3, 3), 0.01);
    test_layer(
        mlp(&[4, 3], Activation::Tanh)
            .with(LinearLayer::new(3, 1))
            .with(BiasLayer::new(Ix2(1, 1))),
        (4, 4),
        0.01,
    );
    test_layer(mlp(&[3, 5, 2], Activation::Tanh).parallel(2), (5, 3), 0.01);
}

#[test]
fn stack_matches_static_sequence() {
    let stack = Stack::new()
        .with(LinearLayer::new(3, 2))
        .with(BiasLayer::new(Ix2(1, 2)))
        .with(ActivationLayer::new(Activation::Tanh));
    let seq = InputLayer::<Ix2>::new().linear(3, 2).tanh();
    assert_eq!(stack.num_params(), seq.num_params());

    let params = Array::random(stack.num_params(), Uniform::new(-1.0, 1.0));
    let x = Array::random((4, 3), Uniform::new(-1.0, 1.0));

    let run = |layer: &dyn Layer<Ix2, Output = Ix2>| {
        let mut tmp = Array2::zeros(layer.hidden_activations_shape(x.raw_dim()));
        let mut y = Array2::zeros(layer.output_shape(x.raw_dim()));
        layer.apply(params.view(), x.view(), tmp.view_mut(), y.view_mut());
        y
    };
    let (a, b) = (run(&stack), run(&seq));
    assert!(
        a.iter().zip(&b).all(|(p, q)| (p - q).abs() < 1e-6),
        "stack {a} vs sequence {b}"
    );
}

#[test]
fn kernel_is_first_dense_layer() {
    let layer = Sequence::new(BiasLayer::new(Ix2(1, 2)), LinearLayer::new(2, 3));
    let params = Array::from_iter((0..Layer::<Ix2>::num_params(&layer)).map(|i| i as f32));
    let k = Layer::<Ix2>::kernel(&layer, params.view()).unwrap();
    assert_eq!(k.shape(), &[2, 3]);
    // the bias comes first in the flat parameters
    assert_eq!(k[[0, 0]], 2.0);

    let mut rows = vec![];
    layer.describe(Ix2(1, 2), &mut rows);
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Bias", "Dense"]);
    assert_eq!(rows[1].output_shape, vec![3]);
    assert_eq!(rows[1].num_params, 6);

    let relu = ActivationLayer::new(Activation::Relu);
    assert!(Layer::<Ix2>::kernel(&relu, params.view()).is_none());
}
