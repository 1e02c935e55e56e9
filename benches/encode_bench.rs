use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vkforge::{
    ArgGroup, ComputeGraph, DType, ExecuteNode, GraphConfig, MemoryAccess, ParamsBuffer,
    PrepackNode, ShaderInfo, WorkgroupSize,
};

fn graph_with_execute_nodes(node_count: usize) -> ComputeGraph {
    let mut g = ComputeGraph::new(GraphConfig::default());
    for i in 0..node_count {
        let a = g.add_tensor(vec![64, 64], DType::F32).unwrap();
        let b = g.add_tensor(vec![64, 64], DType::F32).unwrap();
        g.add_execute_node(ExecuteNode::new(
            ShaderInfo::new(&format!("matmul_{}", i % 4), 3),
            WorkgroupSize::new(64, 64, 1),
            WorkgroupSize::new(16, 16, 1),
            vec![
                ArgGroup::new(a, MemoryAccess::Write),
                ArgGroup::new(b, MemoryAccess::Read),
            ],
            ParamsBuffer::from_slice(&[64u32.to_le_bytes(), 64u32.to_le_bytes()].concat()),
        ));
    }
    g
}

fn graph_with_prepack_nodes(node_count: usize) -> ComputeGraph {
    let mut g = ComputeGraph::new(GraphConfig::default());
    for i in 0..node_count {
        let source = g.add_tensorref(vec![256], DType::F32, vec![0u8; 1024]);
        let dest = g.add_tensor(vec![256], DType::F32).unwrap();
        g.add_prepack_node(PrepackNode::new(
            ShaderInfo::new(&format!("pack_{}", i % 4), 3),
            WorkgroupSize::new(256, 1, 1),
            WorkgroupSize::new(64, 1, 1),
            source,
            dest,
            ParamsBuffer::empty(),
        ));
    }
    g
}

fn bench_encode_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_execute");
    for node_count in [16, 64, 256] {
        group.throughput(Throughput::Elements(node_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(node_count),
            &node_count,
            |b, &node_count| {
                let mut g = graph_with_execute_nodes(node_count);
                b.iter(|| {
                    g.encode_execute().unwrap();
                    g.execute().unwrap()
                });
            },
        );
    }
    group.finish();
}

fn bench_encode_prepack(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_prepack");
    for node_count in [16, 64] {
        group.throughput(Throughput::Elements(node_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(node_count),
            &node_count,
            |b, &node_count| {
                let mut g = graph_with_prepack_nodes(node_count);
                b.iter(|| {
                    g.encode_prepack().unwrap();
                    g.prepack().unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_encode_execute, bench_encode_prepack);
criterion_main!(benches);
