use ndarray::{ArrayD, Zip};

use crate::model::network::ForecastNetwork;

/// Adam 옵티마이저 (β1=0.9, β2=0.999, ε=1e-8)
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    first_moment: Vec<ArrayD<f64>>,
    second_moment: Vec<ArrayD<f64>>,
}

impl Adam {
    pub fn new(network: &ForecastNetwork, learning_rate: f64) -> Self {
        let zeros: Vec<ArrayD<f64>> = network
            .tensors()
            .iter()
            .map(|t| ArrayD::zeros(t.raw_dim()))
            .collect();
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
            first_moment: zeros.clone(),
            second_moment: zeros,
        }
    }

    pub fn steps_taken(&self) -> i32 {
        self.step
    }

    /// 기울기 `grads`(같은 구조의 네트워크)로 파라미터를 한 번 갱신한다
    pub fn step(&mut self, network: &mut ForecastNetwork, grads: &ForecastNetwork) {
        self.step += 1;
        let (b1, b2, lr, eps) = (self.beta1, self.beta2, self.learning_rate, self.epsilon);
        let bias1 = 1.0 - b1.powi(self.step);
        let bias2 = 1.0 - b2.powi(self.step);

        let grads = grads.tensors();
        for (((param, grad), m), v) in network
            .tensors_mut()
            .into_iter()
            .zip(grads.iter())
            .zip(self.first_moment.iter_mut())
            .zip(self.second_moment.iter_mut())
        {
            Zip::from(param)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    let m_hat = *m / bias1;
                    let v_hat = *v / bias2;
                    *p -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::network::{ForwardMode, NetworkConfig};
    use ndarray::{Array2, Array3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_adam_reduces_loss() {
        let config = NetworkConfig {
            input_size: 2,
            hidden_size_1: 6,
            hidden_size_2: 4,
            dense_size_1: 4,
            dense_size_2: 4,
            num_horizons: 1,
            dropout: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut net = ForecastNetwork::new(config, &mut rng);
        let mut adam = Adam::new(&net, 0.01);

        let x = Array3::from_shape_fn((8, 4, 2), |(b, t, f)| ((b + t + f) % 5) as f64 / 5.0);
        let y = Array2::from_shape_fn((8, 1), |(b, _)| b as f64 / 10.0);

        let mse = |net: &ForecastNetwork| (&net.predict(&x) - &y).mapv(|v| v * v).mean().unwrap_or(0.0);
        let before = mse(&net);
        for _ in 0..200 {
            let (out, cache) = net.forward_with_cache(&x, ForwardMode::Eval);
            let d_out = (&out - &y) * (2.0 / out.len() as f64);
            let grads = net.backward(&cache, &d_out);
            adam.step(&mut net, &grads);
        }
        let after = mse(&net);
        assert!(after < before * 0.5, "before {} after {}", before, after);
        assert_eq!(adam.steps_taken(), 200);
    }
}
