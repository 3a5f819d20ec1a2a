use criterion::{black_box, criterion_group, criterion_main, Criterion};

use linkgram::dictionary::Dictionary;
use linkgram::options::ParseOptions;
use linkgram::sentence::Sentence;

const DICT_SRC: &str = include_str!("./toy.dict");

fn parse(dict: &Dictionary, input: &str) -> usize {
  let mut sentence = Sentence::new(input, dict).unwrap();
  sentence.parse(&mut ParseOptions::default()).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
  let dict = DICT_SRC.parse::<Dictionary>().unwrap();
  let simple_input = "the dog chased a cat";
  let complex_input = "the big old dog chased a small red ball in the park near the girl with a cat";

  c.bench_function("parse simple", |b| {
    b.iter(|| parse(black_box(&dict), black_box(simple_input)))
  });

  c.bench_function("parse long prepositional chain", |b| {
    b.iter(|| parse(black_box(&dict), black_box(complex_input)))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
