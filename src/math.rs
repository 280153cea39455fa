use std::iter;

use nalgebra::Vector3;

pub trait IteratorAvg<T>: Iterator<Item = T> {
    fn avg(self) -> Option<T>;
}

macro_rules! impl_avg {
    ($($a:ty),*) => ($(
        impl<I> IteratorAvg<$a> for I
        where
            I: Iterator<Item = $a>,
        {
            fn avg(self) -> Option<$a> {
                iter::zip(self, 1usize..)
                    .reduce(|(sum, _), (next, cnt)| (sum + next, cnt))
                    .map(|(sum, cnt)| sum / cnt as f64)
            }
        }
    )*)
}

impl_avg! { f64, Vector3<f64> }

pub trait IteratorStd: Iterator<Item = f64> {
    fn avg_with_std(self) -> Option<(f64, f64)>;
}

impl<I> IteratorStd for I
where
    I: Iterator<Item = f64>,
{
    fn avg_with_std(self) -> Option<(f64, f64)> {
        let values = self.collect::<Vec<_>>();
        let avg = values.iter().copied().avg()?;
        values
            .into_iter()
            .map(|x| (x - avg).powi(2))
            .avg()
            .map(|var| (avg, var.sqrt()))
    }
}
