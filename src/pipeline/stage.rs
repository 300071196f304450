/*
    efmfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/

//! The [Stage] trait is the common interface of every pipeline stage.
//!
//! A stage consumes units of its input type through [Stage::push] and queues zero or more units
//! of output, which are drained through [Stage::pull]. [Stage::flush] is called once at the end
//! of the input and drains any units still held in internal delays.

use std::collections::VecDeque;

pub trait Stage {
    type Input;
    type Output;

    /// Feed one unit into the stage.
    fn push(&mut self, input: Self::Input);

    /// Take the next available output unit, if any.
    fn pull(&mut self) -> Option<Self::Output>;

    /// Emit everything still held inside the stage.
    fn flush(&mut self);

    /// Push one unit and collect every output it produced.
    fn process(&mut self, input: Self::Input) -> Vec<Self::Output> {
        self.push(input);
        self.drain()
    }

    /// Collect every queued output.
    fn drain(&mut self) -> Vec<Self::Output> {
        std::iter::from_fn(|| self.pull()).collect()
    }
}

/// An output queue sized for a stage's intrinsic delay. `bound` is the most units a single push
/// or flush may queue; growing past it is logged.
#[derive(Clone, Debug)]
pub struct StageQueue<T> {
    items: VecDeque<T>,
    bound: usize,
}

impl<T> StageQueue<T> {
    pub fn new(bound: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(bound),
            bound,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.bound {
            log::debug!("StageQueue::push(): queue exceeded its bound of {}", self.bound);
        }
        self.items.push_back(item);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
