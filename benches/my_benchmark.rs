use criterion::{criterion_group, criterion_main, Criterion};
use treelox::{Lox, OutputBuffer};

fn fibonacci() {
    let src = r#"
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 2) + fib(n - 1);
        }

        fib(25);
    "#;

    let mut lox = Lox::new();
    lox.run(src).unwrap();
}

fn counters() {
    let src = r#"
        fun makeCounter() {
            var count = 0;
            fun increment() {
                count = count + 1;
                return count;
            }
            return increment;
        }

        var a = makeCounter();
        var b = makeCounter();
        var sum = 0;
        for (var i = 0; i < 50000; i = i + 1) {
            sum = sum + a() - b();
        }
        print sum;
    "#;

    let mut lox = Lox::with_output(OutputBuffer::new());
    lox.run(src).unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("fib 25", |b| b.iter(fibonacci));
    c.bench_function("closure counters", |b| b.iter(counters));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
