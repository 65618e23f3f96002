//! Parse, compile and release throughput.
//!
//! Every iteration returns all of its handles, so the arena stays at a fixed
//! size and the free list is churned on every allocation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sfc_bridge::bridge::owned::Compiler;
use sfc_bridge::{Context, Handle};

const COUNTER: &str = "<script setup lang=\"ts\">
import { ref, computed } from 'vue'
import Child from './Child.vue'
const props = defineProps(['step'])
const count = ref(0)
const double = computed(() => count.value * 2)
function inc() { count.value += props.step }
</script>

<template>
  <div class=\"counter\" @click=\"inc\">
    <Child v-for=\"i in double\" :key=\"i\" :n=\"i\" />
    <p v-if=\"count > 10\">{{ count }} / {{ double }}</p>
  </div>
</template>

<style scoped>
.counter { color: v-bind(color) }
.counter p:hover { font-weight: bold }
</style>
";

/// One full pipeline over raw handles, releasing everything it allocated.
fn compile_all(ctx: &mut Context, source: &[u8]) -> usize {
    let mut held: Vec<Handle> = Vec::new();
    let parsed = ctx.parse(source, b"Counter.vue");
    let descriptor = ctx.parse_result_descriptor(parsed);
    let script = ctx.compile_script(descriptor, b"data-v-bench", false);
    let bindings = ctx.script_result_bindings(script);
    held.extend([parsed, descriptor, script, bindings]);

    let mut out = ctx.script_result_content(script).len();
    let template = ctx.template(descriptor);
    let content = ctx.block_content(template).to_string();
    let compiled = ctx.compile_template(content.as_bytes(), b"Counter.vue", b"data-v-bench", true, bindings);
    out += ctx.template_result_code(compiled).len();
    held.extend([template, compiled]);

    for i in 0..ctx.style_count(descriptor) {
        let style = ctx.style_at(descriptor, i);
        let content = ctx.block_content(style).to_string();
        let result = ctx.compile_style(content.as_bytes(), b"Counter.vue", b"data-v-bench", true);
        out += ctx.style_result_code(result).len();
        held.extend([style, result]);
    }

    for h in held.into_iter().rev() {
        ctx.release(h);
    }
    out
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    let mut ctx = Context::new().unwrap();
    group.bench_function("handles", |b| {
        b.iter(|| compile_all(&mut ctx, black_box(COUNTER.as_bytes())));
    });
    assert_eq!(ctx.arena().live_count(), 0);

    let compiler = Compiler::new().unwrap();
    group.bench_function("owned", |b| {
        b.iter(|| {
            let parsed = compiler.parse(black_box(COUNTER), "Counter.vue").unwrap();
            let descriptor = parsed.descriptor().unwrap();
            let script = descriptor.compile_script("data-v-bench", false).unwrap();
            let template = descriptor.template().unwrap();
            let compiled = compiler
                .compile_template(template.content(), "Counter.vue", "data-v-bench", true, Some(&script))
                .unwrap();
            compiled.code().len()
        });
    });
    assert_eq!(compiler.live_count(), 0);

    group.finish();
}

/// Reads of one field repeated `n` times on a single handle; the string cache
/// grows by one entry per read.
fn bench_repeated_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("repeated_reads");
    for &n in &[10_usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut ctx = Context::new().unwrap();
            b.iter(|| {
                let parsed = ctx.parse(COUNTER.as_bytes(), b"Counter.vue");
                let descriptor = ctx.parse_result_descriptor(parsed);
                let mut total = 0;
                for _ in 0..n {
                    total += ctx.filename(descriptor).len();
                }
                ctx.release(descriptor);
                ctx.release(parsed);
                total
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_repeated_reads);
criterion_main!(benches);
